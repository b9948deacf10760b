// core/src/realtime/sse.rs

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
  pub event: Option<String>,
  pub data: String,
}

/// Incremental `text/event-stream` parser. Feed it chunks as they arrive;
/// it hands back every frame completed by that chunk.
#[derive(Debug, Default)]
pub struct SseDecoder {
  buffer: String,
  pending: Vec<u8>,
  event: Option<String>,
  data: Vec<String>,
}

impl SseDecoder {
  pub fn new() -> Self {
    SseDecoder::default()
  }

  pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
    self.pending.extend_from_slice(chunk);
    // Keep an incomplete UTF-8 sequence for the next chunk.
    let valid = match std::str::from_utf8(&self.pending) {
      Ok(text) => text.len(),
      Err(err) if err.error_len().is_none() => err.valid_up_to(),
      Err(err) => {
        let upto = err.valid_up_to() + err.error_len().unwrap_or(1);
        let lossy = String::from_utf8_lossy(&self.pending[..upto]).into_owned();
        self.buffer.push_str(&lossy);
        self.pending.drain(..upto);
        return self.feed(&[]);
      }
    };
    let rest = self.pending.split_off(valid);
    let text = String::from_utf8_lossy(&self.pending).into_owned();
    self.pending = rest;
    self.buffer.push_str(&text);

    let mut frames = Vec::new();
    while let Some(end) = self.buffer.find('\n') {
      let line: String = self.buffer.drain(..=end).collect();
      let line = line.trim_end_matches('\n').trim_end_matches('\r');
      if let Some(frame) = self.line(line) {
        frames.push(frame);
      }
    }
    frames
  }

  fn line(&mut self, line: &str) -> Option<SseFrame> {
    if line.is_empty() {
      return self.dispatch();
    }
    if line.starts_with(':') {
      return None;
    }
    let (field, value) = match line.split_once(':') {
      Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
      None => (line, ""),
    };
    match field {
      "data" => self.data.push(value.to_string()),
      "event" => self.event = Some(value.to_string()),
      _ => {}
    }
    None
  }

  fn dispatch(&mut self) -> Option<SseFrame> {
    if self.data.is_empty() {
      self.event = None;
      return None;
    }
    Some(SseFrame {
      event: self.event.take(),
      data: std::mem::take(&mut self.data).join("\n"),
    })
  }
}
