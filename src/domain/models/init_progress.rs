#[cfg(test)]
#[path = "init_progress_test.rs"]
mod tests;

/// Snapshot of a model load as reported by a generation worker. Within one
/// init lifecycle none of the fields decrease.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InitProgress {
    /// Fraction loaded, between 0 and 1.
    pub progress: f64,
    /// Seconds since the load started.
    pub time_elapsed: f64,
    pub current_chunk: u64,
    pub total_chunks: u64,
    pub fetched_bytes: u64,
    pub total_bytes: u64,
}

impl InitProgress {
    pub fn zero() -> InitProgress {
        return InitProgress::default();
    }

    pub fn is_complete(&self) -> bool {
        return self.progress >= 1.0;
    }

    pub fn describe(&self) -> String {
        let percent = (self.progress.clamp(0.0, 1.0) * 100.0).round() as u64;
        let mut res = format!("Loading model: {percent}%");

        if self.total_chunks > 0 {
            res = format!(
                "{res}, chunk {}/{}",
                self.current_chunk, self.total_chunks
            );
        }

        if self.total_bytes > 0 {
            res = format!(
                "{res}, {} / {}",
                format_bytes(self.fetched_bytes),
                format_bytes(self.total_bytes)
            );
        }

        return format!("{res}, {}s elapsed", self.time_elapsed.round() as u64);
    }
}

fn format_bytes(bytes: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < units.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        return format!("{bytes} B");
    }

    return format!("{value:.1} {}", units[unit]);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl InitState {
    /// Whether a new `init` call should start loading.
    pub fn can_start(&self) -> bool {
        return matches!(self, InitState::Uninitialized | InitState::Failed(_));
    }
}
