use marten_sat::structures::{serialize_cubes, unserialize_cubes, Cube};

mod serialization {
    use super::*;

    #[test]
    fn round_trip_identity() {
        let cubes = vec![
            Cube::new(vec![3]),
            Cube::new(vec![1, -2, 5]),
            Cube::new(vec![-4, -6]),
            Cube::new(vec![7, 8, -9, 10]),
        ];

        assert_eq!(unserialize_cubes(&serialize_cubes(&cubes)), cubes);
    }

    #[test]
    fn empty_list_round_trips() {
        assert!(unserialize_cubes(&serialize_cubes(&[])).is_empty());
    }

    #[test]
    fn each_cube_is_sentinel_terminated() {
        let stream = serialize_cubes(&[Cube::new(vec![1, 2]), Cube::new(vec![-3])]);

        assert_eq!(stream, vec![1, 2, 0, -3, 0]);
    }
}

mod containment {
    use super::*;

    #[test]
    fn supersets_include_their_subsets() {
        let failed = Cube::new(vec![1]);

        assert!(Cube::new(vec![1, 2]).includes(&failed));
        assert!(Cube::new(vec![1, -2]).includes(&failed));
        assert!(!Cube::new(vec![-1, 3]).includes(&failed));
    }

    #[test]
    fn containment_ignores_path_order() {
        let a = Cube::new(vec![2, -5, 7]);
        let b = Cube::new(vec![7, 2]);

        assert!(a.includes(&b));
    }

    #[test]
    fn polarity_matters() {
        let cube = Cube::new(vec![1, 2]);

        assert!(!cube.includes(&Cube::new(vec![-1])));
    }

    #[test]
    fn canonical_form_is_content_addressed() {
        assert_eq!(
            Cube::new(vec![3, -1, 2]).canonical(),
            Cube::new(vec![2, 3, -1]).canonical(),
        );
    }
}
