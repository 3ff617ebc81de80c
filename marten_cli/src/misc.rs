use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parses a duration string to seconds.
///
/// A bare number is read as seconds; the suffixes `s`, `m`, `h`, and `d` scale as
/// expected.
pub fn parse_duration_seconds(given: &str) -> Option<f64> {
    let given = given.trim();

    let (number, scale) = match given.chars().last()? {
        's' => (&given[..given.len() - 1], 1.0),
        'm' => (&given[..given.len() - 1], 60.0),
        'h' => (&given[..given.len() - 1], 3600.0),
        'd' => (&given[..given.len() - 1], 86400.0),
        _ => (given, 1.0),
    };

    let value: f64 = number.trim().parse().ok()?;
    match value >= 0.0 {
        true => Some(value * scale),
        false => None,
    }
}

/// Reads a DIMACS form CNF file to a flat clause stream.
///
/// Comment and problem lines are skipped; the sentinel-terminated literal stream is
/// returned as-is.
pub fn load_dimacs(path: &Path) -> std::io::Result<Vec<i32>> {
    let mut stream = Vec::new();

    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('c') || line.starts_with('p') {
            continue;
        }

        for token in line.split_whitespace() {
            match token.parse::<i32>() {
                Ok(literal) => stream.push(literal),
                Err(_) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("unreadable literal: {token}"),
                    ))
                }
            }
        }
    }

    // A final clause without its sentinel is closed here.
    if stream.last().is_some_and(|literal| *literal != 0) {
        stream.push(0);
    }

    Ok(stream)
}

#[cfg(test)]
mod misc_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn durations() {
        assert_eq!(parse_duration_seconds("10"), Some(10.0));
        assert_eq!(parse_duration_seconds("10s"), Some(10.0));
        assert_eq!(parse_duration_seconds("5m"), Some(300.0));
        assert_eq!(parse_duration_seconds("1.5h"), Some(5400.0));
        assert_eq!(parse_duration_seconds("2d"), Some(172800.0));
        assert_eq!(parse_duration_seconds("soon"), None);
        assert_eq!(parse_duration_seconds("-1s"), None);
    }

    #[test]
    fn dimacs_reading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "c a comment").unwrap();
        writeln!(file, "p cnf 2 2").unwrap();
        writeln!(file, "1 2 0").unwrap();
        writeln!(file, "-1 2").unwrap();

        let stream = load_dimacs(file.path()).unwrap();
        assert_eq!(stream, vec![1, 2, 0, -1, 2, 0]);
    }
}
