//! Server-Sent Events assembly.
//!
//! Framing is left to the caller: it feeds complete lines, without their
//! terminators, and gets back an event each time a blank line closes one.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of one event. Multiple `data:` lines are joined with `\n`.
    Data(String),
    /// The `[DONE]` sentinel that ends a completion stream.
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    data: Vec<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds one line and returns the event it completed, if any.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if self.done {
            return None;
        }
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return self.dispatch();
        }
        // Comments, `event:`, `id:` and `retry:` carry nothing we use.
        if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
        }
        None
    }

    /// Flushes a trailing event when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.done {
            return None;
        }
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        if data.trim() == "[DONE]" {
            self.done = true;
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut SseDecoder, lines: &[&str]) -> Vec<SseEvent> {
        lines.iter().filter_map(|line| decoder.push_line(line)).collect()
    }

    #[test]
    fn blank_line_closes_event() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push_line("data: {\"a\":1}"), None);
        assert_eq!(decoder.push_line(""), Some(SseEvent::Data("{\"a\":1}".into())));
    }

    #[test]
    fn joins_multiple_data_lines() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, &["data: first", "data:second", ""]);
        assert_eq!(events, vec![SseEvent::Data("first\nsecond".into())]);
    }

    #[test]
    fn stops_at_done() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, &["data: one", "", "data: [DONE]", "", "data: late", ""]);

        assert_eq!(events, vec![SseEvent::Data("one".into()), SseEvent::Done]);
        assert!(decoder.is_done());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn ignores_comments_and_stray_carriage_returns() {
        let mut decoder = SseDecoder::new();
        let events = feed(&mut decoder, &[": keep-alive", "\r", "event: delta\r", "data: x\r", "\r"]);
        assert_eq!(events, vec![SseEvent::Data("x".into())]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push_line("data: tail"), None);
        assert_eq!(decoder.finish(), Some(SseEvent::Data("tail".into())));
        assert_eq!(decoder.finish(), None);
    }
}
