//! Terminal rendering for `bs run`

use colored::Colorize;
use eyre::{Result, eyre};

use bgsort::{CompletionEvent, ExchangeEvent, SortEvent};

/// Keeps a mirror of the array and renders it after every exchange
#[derive(Debug, Clone)]
pub struct TextRenderer {
    mirror: Vec<i32>,
    color: bool,
    width: usize,
}

impl TextRenderer {
    pub fn new(initial: &[i32], color: bool) -> Self {
        let width = initial.iter().map(|v| v.to_string().len()).max().unwrap_or(1);
        Self {
            mirror: initial.to_vec(),
            color,
            width,
        }
    }

    /// The mirrored array without highlights
    pub fn plain_line(&self) -> String {
        self.line(None)
    }

    /// Apply an exchange to the mirror and render the result
    pub fn apply(&mut self, event: &ExchangeEvent) -> Result<String> {
        let len = self.mirror.len();
        if event.first_index >= len || event.second_index >= len {
            return Err(eyre!(
                "exchange ({}, {}) outside array of length {}",
                event.first_index,
                event.second_index,
                len
            ));
        }
        self.mirror[event.first_index] = event.first_value;
        self.mirror[event.second_index] = event.second_value;
        Ok(self.line(Some((event.first_index, event.second_index))))
    }

    /// One line describing how the run ended
    pub fn summary(&self, event: &CompletionEvent) -> String {
        let (label, detail) = match (&event.fault, event.canceled) {
            (Some(fault), _) => ("fault", fault.clone()),
            (None, true) => ("canceled", format!("after {} exchanges", event.exchanges)),
            (None, false) => ("done", format!("{} exchanges", event.exchanges)),
        };
        let label = if self.color {
            match label {
                "fault" => label.red().bold().to_string(),
                "canceled" => label.yellow().bold().to_string(),
                _ => label.green().bold().to_string(),
            }
        } else {
            label.to_string()
        };
        format!("{label}: {detail} in {}ms (run {})", event.elapsed_ms, event.run_id)
    }

    fn line(&self, highlight: Option<(usize, usize)>) -> String {
        self.mirror
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let cell = format!("{v:>width$}", width = self.width);
                match highlight {
                    Some((a, b)) if i == a || i == b => {
                        if self.color {
                            format!("[{}]", cell.cyan().bold())
                        } else {
                            format!("[{cell}]")
                        }
                    }
                    _ => format!(" {cell} "),
                }
            })
            .collect::<Vec<_>>()
            .join("")
            .trim_end()
            .to_string()
    }
}

/// Serialize an event as one JSON line
pub fn json_line(event: &SortEvent) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgsort::RunId;

    fn exchange(first_index: usize, second_index: usize, first_value: i32, second_value: i32) -> ExchangeEvent {
        ExchangeEvent {
            first_value,
            second_value,
            first_index,
            second_index,
        }
    }

    #[test]
    fn test_apply_updates_mirror() {
        let mut renderer = TextRenderer::new(&[5, 3, 4, 1], false);
        assert_eq!(renderer.plain_line(), " 5  3  4  1");

        let line = renderer.apply(&exchange(0, 1, 3, 5)).unwrap();
        assert_eq!(line, "[3][5] 4  1");
        assert_eq!(renderer.plain_line(), " 3  5  4  1");
    }

    #[test]
    fn test_apply_rejects_out_of_range() {
        let mut renderer = TextRenderer::new(&[1, 2], false);
        assert!(renderer.apply(&exchange(0, 2, 1, 1)).is_err());
        assert_eq!(renderer.plain_line(), " 1  2");
    }

    #[test]
    fn test_cells_are_padded() {
        let renderer = TextRenderer::new(&[100, 7], false);
        assert_eq!(renderer.plain_line(), " 100    7");
    }

    #[test]
    fn test_summary_variants() {
        let renderer = TextRenderer::new(&[], false);
        let mut event = CompletionEvent {
            run_id: RunId::new(),
            canceled: false,
            fault: None,
            exchanges: 5,
            elapsed_ms: 3,
        };
        assert!(renderer.summary(&event).starts_with("done: 5 exchanges in 3ms"));

        event.canceled = true;
        assert!(renderer.summary(&event).starts_with("canceled: after 5 exchanges"));

        event.canceled = false;
        event.fault = Some("boom".to_string());
        assert!(renderer.summary(&event).starts_with("fault: boom"));
    }

    #[test]
    fn test_json_line() {
        let line = json_line(&SortEvent::Exchange(exchange(0, 1, 3, 5))).unwrap();
        assert!(line.starts_with(r#"{"type":"Exchange""#));
        assert!(line.contains(r#""first_index":0"#));
    }
}
