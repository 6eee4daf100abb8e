//! `StreamId`: a `(ms, seq)` pair giving strict total order over stream
//! entries (`spec.md` §3).
use std::fmt;

use crate::error::CmdError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// The next representable id after this one (used for `XREAD`'s
    /// exclusive lower bound and to compute the auto-sequence on `XADD`).
    pub fn next_seq(self) -> Option<StreamId> {
        self.seq.checked_add(1).map(|seq| StreamId { ms: self.ms, seq })
    }

    /// Parse an explicit id argument: `"<ms>-<seq>"` or `"<ms>"` (seq
    /// defaults to 0). Sentinels `-`/`+`/`$`/`*` are handled by callers that
    /// have the extra context (current top id, "current last id") needed to
    /// resolve them; this function only parses the explicit numeric form.
    pub fn parse_explicit(input: &[u8]) -> Result<StreamId, CmdError> {
        let text = std::str::from_utf8(input).map_err(|_| CmdError::custom("Invalid stream ID specified as stream command argument"))?;
        let (ms_part, seq_part) = match text.split_once('-') {
            Some((ms, seq)) => (ms, Some(seq)),
            None => (text, None),
        };
        let ms: u64 = ms_part
            .parse()
            .map_err(|_| CmdError::custom("Invalid stream ID specified as stream command argument"))?;
        let seq: u64 = match seq_part {
            Some(s) => s
                .parse()
                .map_err(|_| CmdError::custom("Invalid stream ID specified as stream command argument"))?,
            None => 0,
        };
        Ok(StreamId { ms, seq })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_forms() {
        assert_eq!(StreamId::parse_explicit(b"5-10").unwrap(), StreamId::new(5, 10));
        assert_eq!(StreamId::parse_explicit(b"5").unwrap(), StreamId::new(5, 0));
    }

    #[test]
    fn rejects_garbage() {
        assert!(StreamId::parse_explicit(b"not-a-number").is_err());
        assert!(StreamId::parse_explicit(b"abc").is_err());
    }

    #[test]
    fn orders_lexicographically() {
        assert!(StreamId::new(1, 5) < StreamId::new(2, 0));
        assert!(StreamId::new(2, 0) < StreamId::new(2, 1));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let id = StreamId::new(42, 7);
        assert_eq!(StreamId::parse_explicit(id.to_string().as_bytes()).unwrap(), id);
    }
}
