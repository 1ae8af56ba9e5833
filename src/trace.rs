use crate::{Error, Result};

/// Bounded buffer of trace lines, optionally echoed to stderr.
#[derive(Debug, Clone)]
pub(crate) struct TraceLog {
    enabled: bool,
    to_stderr: bool,
    limit: usize,
    lines: Vec<String>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self {
            enabled: false,
            to_stderr: true,
            limit: 10_000,
            lines: Vec::new(),
        }
    }
}

impl TraceLog {
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_stderr(&mut self, enabled: bool) {
        self.to_stderr = enabled;
    }

    pub(crate) fn set_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidOption(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.limit = max_entries;
        if self.lines.len() > self.limit {
            let overflow = self.lines.len() - self.limit;
            self.lines.drain(..overflow);
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub(crate) fn line(&mut self, line: String) {
        if !self.enabled {
            return;
        }
        if self.to_stderr {
            eprintln!("{line}");
        }
        if self.lines.len() >= self.limit {
            self.lines.remove(0);
        }
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_trace_records_nothing() {
        let mut log = TraceLog::default();
        log.line("[validate] ignored".into());
        assert!(log.take().is_empty());
    }

    #[test]
    fn limit_evicts_oldest_lines() -> Result<()> {
        let mut log = TraceLog::default();
        log.set_enabled(true);
        log.set_stderr(false);
        for n in 0..4 {
            log.line(format!("line {n}"));
        }
        log.set_limit(2)?;
        assert_eq!(log.take(), ["line 2", "line 3"]);

        log.line("a".into());
        log.line("b".into());
        log.line("c".into());
        assert_eq!(log.take(), ["b", "c"]);
        Ok(())
    }

    #[test]
    fn zero_limit_is_rejected() {
        let mut log = TraceLog::default();
        let err = log.set_limit(0).expect_err("zero limit");
        assert!(matches!(err, Error::InvalidOption(_)));
        assert_eq!(
            err.to_string(),
            "invalid option: set_trace_log_limit requires at least 1 entry"
        );
    }
}
