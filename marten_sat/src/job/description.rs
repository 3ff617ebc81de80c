/*!
Job descriptions and their serialized form.

A description carries everything a process needs to take part in a job: identity,
revision, scheduling inputs (priority, limits, demand ceiling), and the formula as a
flat clause stream.

Descriptions travel as byte payloads --- a fixed header followed by the literal
stream --- and incremental jobs ship deltas: a further description with a bumped
revision whose payload extends the formula.
*/

use crate::{
    structures::{Lit, STREAM_END},
    types::err::{self},
};

/// The application a job belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Application {
    /// Cube-and-conquer satisfiability.
    Sat,

    /// A placeholder application, for scheduling experiments.
    Dummy,
}

/// The description of a job.
#[derive(Clone, Debug)]
pub struct JobDescription {
    pub id: i32,

    /// Monotonically increasing within an id.
    pub revision: i32,

    /// Priority, nonnegative.
    pub priority: f64,

    pub incremental: bool,

    pub application: Application,

    /// Wallclock limit in seconds, with `0` read as unset.
    pub wallclock_limit: f64,

    /// CPU-seconds limit, with `0` read as unset.
    pub cpu_limit: f64,

    /// A per-job demand ceiling, with `0` read as unset.
    pub max_demand: i32,

    /// The formula as a flat clause stream, sentinel-terminated clauses.
    pub payload: Vec<Lit>,
}

impl JobDescription {
    pub fn new(id: i32, priority: f64, incremental: bool) -> Self {
        JobDescription {
            id,
            revision: 0,
            priority,
            incremental,
            application: Application::Sat,
            wallclock_limit: 0.0,
            cpu_limit: 0.0,
            max_demand: 0,
            payload: Vec::new(),
        }
    }

    /// The number of literals of the formula, sentinels excluded.
    pub fn num_literals(&self) -> usize {
        self.payload
            .iter()
            .filter(|literal| **literal != STREAM_END)
            .count()
    }

    /// The description as a byte payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(38 + 4 * self.payload.len());

        bytes.extend(self.id.to_le_bytes());
        bytes.extend(self.revision.to_le_bytes());
        bytes.extend(self.priority.to_le_bytes());
        bytes.push(u8::from(self.incremental));
        bytes.push(match self.application {
            Application::Sat => 0,
            Application::Dummy => 1,
        });
        bytes.extend(self.wallclock_limit.to_le_bytes());
        bytes.extend(self.cpu_limit.to_le_bytes());
        bytes.extend(self.max_demand.to_le_bytes());
        bytes.extend((self.payload.len() as u32).to_le_bytes());
        for literal in &self.payload {
            bytes.extend(literal.to_le_bytes());
        }

        bytes
    }

    /// A description read back from a byte payload.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, err::DescriptionError> {
        let mut reader = Reader { bytes, at: 0 };

        let id = i32::from_le_bytes(reader.take()?);
        let revision = i32::from_le_bytes(reader.take()?);
        let priority = f64::from_le_bytes(reader.take()?);
        let incremental = u8::from_le_bytes(reader.take()?) != 0;
        let application = match u8::from_le_bytes(reader.take()?) {
            1 => Application::Dummy,
            _ => Application::Sat,
        };
        let wallclock_limit = f64::from_le_bytes(reader.take()?);
        let cpu_limit = f64::from_le_bytes(reader.take()?);
        let max_demand = i32::from_le_bytes(reader.take()?);

        let literal_count = u32::from_le_bytes(reader.take()?) as usize;
        let mut payload = Vec::with_capacity(literal_count);
        for _ in 0..literal_count {
            payload.push(i32::from_le_bytes(reader.take()?));
        }

        if payload.is_empty() {
            return Err(err::DescriptionError::EmptyPayload);
        }
        if payload.last() != Some(&STREAM_END) {
            return Err(err::DescriptionError::UnterminatedClause);
        }

        Ok(JobDescription {
            id,
            revision,
            priority,
            incremental,
            application,
            wallclock_limit,
            cpu_limit,
            max_demand,
            payload,
        })
    }

    /// Applies an incremental delta: the revision is adopted and the payload extended.
    pub fn apply_update(&mut self, update: JobDescription) {
        debug_assert_eq!(self.id, update.id);

        self.revision = update.revision;
        self.payload.extend(update.payload);

        if update.wallclock_limit > 0.0 {
            self.wallclock_limit = update.wallclock_limit;
        }
        if update.cpu_limit > 0.0 {
            self.cpu_limit = update.cpu_limit;
        }
        if update.max_demand > 0 {
            self.max_demand = update.max_demand;
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], err::DescriptionError> {
        let end = self.at + N;
        if end > self.bytes.len() {
            return Err(err::DescriptionError::TruncatedHeader);
        }

        let mut taken = [0_u8; N];
        taken.copy_from_slice(&self.bytes[self.at..end]);
        self.at = end;

        Ok(taken)
    }
}

#[cfg(test)]
mod description_tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut description = JobDescription::new(7, 0.25, true);
        description.revision = 2;
        description.max_demand = 12;
        description.payload = vec![1, 2, 0, -1, 2, 0];

        let read = JobDescription::deserialize(&description.serialize()).unwrap();

        assert_eq!(read.id, 7);
        assert_eq!(read.revision, 2);
        assert_eq!(read.priority, 0.25);
        assert!(read.incremental);
        assert_eq!(read.max_demand, 12);
        assert_eq!(read.payload, description.payload);
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert!(matches!(
            JobDescription::deserialize(&[1, 2, 3]),
            Err(err::DescriptionError::TruncatedHeader),
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        let description = JobDescription::new(0, 1.0, false);

        assert!(matches!(
            JobDescription::deserialize(&description.serialize()),
            Err(err::DescriptionError::EmptyPayload),
        ));
    }

    #[test]
    fn unterminated_payload_is_rejected() {
        let mut description = JobDescription::new(0, 1.0, false);
        description.payload = vec![1, 2];

        assert!(matches!(
            JobDescription::deserialize(&description.serialize()),
            Err(err::DescriptionError::UnterminatedClause),
        ));
    }

    #[test]
    fn updates_extend_the_payload() {
        let mut description = JobDescription::new(3, 0.5, true);
        description.payload = vec![1, 0];

        let mut delta = JobDescription::new(3, 0.5, true);
        delta.revision = 1;
        delta.payload = vec![-2, 0];

        description.apply_update(delta);

        assert_eq!(description.revision, 1);
        assert_eq!(description.payload, vec![1, 0, -2, 0]);
    }
}
