// storefront/src/web/handlers/event_handlers.rs

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::web::Bytes;
use actix_web::HttpResponse;
use futures_util::stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument, warn};

use crate::web::extractors::CurrentSession;
use tuckshop::Toast;

/// One server-sent-events frame carrying a toast.
pub fn toast_frame(toast: &Toast) -> Result<Bytes, serde_json::Error> {
  let data = serde_json::to_string(toast)?;
  Ok(Bytes::from(format!("event: toast\nid: {}\ndata: {}\n\n", toast.id, data)))
}

/// Streams the session's toasts to the browser until it disconnects or the
/// session is closed.
#[instrument(name = "handler::events", skip_all, fields(user = %session.user()))]
pub async fn events_handler(session: CurrentSession) -> HttpResponse {
  let receiver = session.shop.notifier().subscribe();
  debug!("Browser subscribed to toasts.");

  let toasts = stream::unfold(receiver, |mut receiver| async move {
    loop {
      match receiver.recv().await {
        Ok(toast) => match toast_frame(&toast) {
          Ok(frame) => return Some((Ok::<_, actix_web::Error>(frame), receiver)),
          Err(err) => warn!(error = %err, "Dropping unserializable toast."),
        },
        Err(RecvError::Lagged(skipped)) => warn!(skipped, "Browser fell behind; toasts dropped."),
        Err(RecvError::Closed) => return None,
      }
    }
  });

  let mut builder = HttpResponse::Ok();
  if let Some(cookie) = session.refreshed_cookie.clone() {
    builder.cookie(cookie);
  }
  builder
    .insert_header((CONTENT_TYPE, "text/event-stream"))
    .insert_header((CACHE_CONTROL, "no-cache"))
    .streaming(toasts)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tuckshop::ToastLevel;

  #[test]
  fn toast_frames_are_complete_sse_events() {
    let toast = Toast::new(ToastLevel::Success, "Order ORD-0001 is ready");
    let frame = toast_frame(&toast).expect("frame");
    let text = std::str::from_utf8(&frame).expect("utf-8");
    assert!(text.starts_with("event: toast\n"));
    assert!(text.contains(&format!("id: {}\n", toast.id)));
    assert!(text.contains(r#""message":"Order ORD-0001 is ready""#));
    assert!(text.contains(r#""level":"success""#));
    assert!(text.ends_with("\n\n"));
  }
}
