//! Stale-response suppression for async fetches. Each request class keeps
//! an incrementing generation; issuing a new request supersedes every
//! earlier one, and a response is applied only while its token is current.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Whole-trace loads (including merges).
    Trace,
    /// Single-span drill-down loads.
    SpanDetail,
}

#[derive(Debug, Default)]
pub struct Generations {
    trace: u64,
    span_detail: u64,
}

impl Generations {
    fn slot(&mut self, class: RequestClass) -> &mut u64 {
        match class {
            RequestClass::Trace => &mut self.trace,
            RequestClass::SpanDetail => &mut self.span_detail,
        }
    }

    /// Start a new request, invalidating all outstanding ones of the same
    /// class. The returned token travels with the request.
    pub fn issue(&mut self, class: RequestClass) -> u64 {
        let slot = self.slot(class);
        *slot += 1;
        *slot
    }

    pub fn is_current(&self, class: RequestClass, token: u64) -> bool {
        match class {
            RequestClass::Trace => self.trace == token,
            RequestClass::SpanDetail => self.span_detail == token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older() {
        let mut generations = Generations::default();
        let first = generations.issue(RequestClass::SpanDetail);
        let second = generations.issue(RequestClass::SpanDetail);
        assert!(!generations.is_current(RequestClass::SpanDetail, first));
        assert!(generations.is_current(RequestClass::SpanDetail, second));
    }

    #[test]
    fn classes_are_independent() {
        let mut generations = Generations::default();
        let trace = generations.issue(RequestClass::Trace);
        generations.issue(RequestClass::SpanDetail);
        assert!(generations.is_current(RequestClass::Trace, trace));
    }
}
