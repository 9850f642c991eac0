use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parcel_engine::{BoxReader, ProxyFn};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn chunk_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg:>16} [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// One progress bar per transfer stream, fed through the engine's proxy hook
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    bars: Arc<Mutex<Vec<ProgressBar>>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(Vec::new())),
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            disabled: true,
            ..Self::new(multi)
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Hook that wraps every stream in a progress bar labelled after it
    pub fn proxy_fn(&self) -> ProxyFn {
        let manager = self.clone();
        Arc::new(move |label: &str, size: u64, reader: BoxReader| manager.track(label, size, reader))
    }

    fn track(&self, label: &str, size: u64, reader: BoxReader) -> BoxReader {
        if self.disabled {
            return reader;
        }

        let bar = self.multi.add(ProgressBar::new(size));
        bar.set_style(chunk_style());
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(500));

        if let Ok(mut bars) = self.bars.lock() {
            bars.push(bar.clone());
        }
        Box::new(bar.wrap_async_read(reader))
    }

    pub fn finish(&self) {
        if let Ok(mut bars) = self.bars.lock() {
            for bar in bars.drain(..) {
                bar.finish();
            }
        }
    }

    pub fn abandon(&self) {
        if let Ok(mut bars) = self.bars.lock() {
            for bar in bars.drain(..) {
                bar.abandon();
            }
        }
    }
}
