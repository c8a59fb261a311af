use std::sync::{Arc, Mutex};

/// Logs an error code only when it differs from the previous one, so a
/// fault that repeats every frame shows up once.
#[derive(Debug, Default)]
pub struct ErrorDeduplicator {
    last: Option<u32>,
}

impl ErrorDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `code` is a new error that should be reported.
    pub fn check(&mut self, code: Option<u32>) -> bool {
        match code {
            Some(c) if self.last != Some(c) => {
                self.last = Some(c);
                true
            }
            _ => false,
        }
    }
}

pub fn wgpu_error_code(error: &wgpu::Error) -> u32 {
    match error {
        wgpu::Error::OutOfMemory { .. } => 1,
        wgpu::Error::Validation { .. } => 2,
        _ => 3,
    }
}

/// Collects uncaptured device errors and reports the first new one after
/// each frame.
pub struct GpuErrorWatch {
    codes: Arc<Mutex<Vec<u32>>>,
    dedup: ErrorDeduplicator,
}

impl GpuErrorWatch {
    pub fn install(device: &wgpu::Device) -> Self {
        let codes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&codes);
        device.on_uncaptured_error(Box::new(move |error| {
            let code = wgpu_error_code(&error);
            log::debug!("Uncaptured GPU error {}: {}", code, error);
            if let Ok(mut codes) = sink.lock() {
                codes.push(code);
            }
        }));
        Self {
            codes,
            dedup: ErrorDeduplicator::new(),
        }
    }

    /// Drain this frame's errors. Returns the code that was logged, if any.
    pub fn post_draw(&mut self) -> Option<u32> {
        let first = match self.codes.lock() {
            Ok(mut codes) => {
                let first = codes.first().copied();
                codes.clear();
                first
            }
            Err(_) => None,
        };
        if self.dedup.check(first) {
            log::error!("GPU error code {}", first.unwrap_or_default());
            return first;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_code_reported_once() {
        let mut dedup = ErrorDeduplicator::new();
        assert!(dedup.check(Some(2)));
        assert!(!dedup.check(Some(2)));
        assert!(dedup.check(Some(1)));
    }

    #[test]
    fn test_clean_frame_keeps_last_code() {
        let mut dedup = ErrorDeduplicator::new();
        assert!(!dedup.check(None));
        assert!(dedup.check(Some(3)));
        assert!(!dedup.check(None));
        assert!(!dedup.check(Some(3)));
    }
}
