use indicatif::ProgressBar;

/// Receives upload progress as a fraction in `[0.0, 1.0]`
///
/// Called after every chunk of the track file is handed to the request body.
/// Calls happen on whichever task polls the body, so implementations must be
/// cheap and thread-safe.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_progress(&self, fraction: f32) {
        self(fraction)
    }
}

/// Moves the bar to the matching byte position, so `{bytes}/{total_bytes}`
/// templates work when the bar length is the file size.
impl ProgressSink for ProgressBar {
    fn on_progress(&self, fraction: f32) {
        let len = self.length().unwrap_or(0);
        self.set_position((f64::from(fraction) * len as f64).round() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |fraction: f32| seen.lock().unwrap().push(fraction);

        sink.on_progress(0.5);
        sink.on_progress(1.0);

        assert_eq!(*seen.lock().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_progress_bar_sink_tracks_bytes() {
        let pb = ProgressBar::hidden();
        pb.set_length(20_000);

        pb.on_progress(0.25);
        assert_eq!(pb.position(), 5_000);

        pb.on_progress(1.0);
        assert_eq!(pb.position(), 20_000);
    }
}
