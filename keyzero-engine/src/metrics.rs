use tokio::time::Instant;

use crate::constants::scan::METRICS_PRINT_INTERVAL_S;

/// Live scan statistics, printed on an interval by the status reporter and
/// once more on shutdown.
pub struct ScanMetrics {
    /// Whether the run traverses a bounded sequential range.
    pub sequential: bool,
    pub range_start: u64,
    pub range_end: u64,
    /// The cursor the run started from (the resume point, or `range_start`).
    pub first_cursor: u64,
    /// The live cursor (sequential) or total draw count (random).
    pub latest_cursor: u64,
    /// Candidates dispatched during this run.
    pub checked: u64,

    prev_checked: u64,
    started_at: Instant,
}

impl ScanMetrics {
    pub fn new(sequential: bool, range_start: u64, range_end: u64, first_cursor: u64) -> Self {
        Self {
            sequential,
            range_start,
            range_end,
            first_cursor,
            latest_cursor: first_cursor,
            checked: 0,
            prev_checked: 0,
            started_at: Instant::now(),
        }
    }

    pub fn print(&mut self) {
        if self.checked == 0 {
            return;
        }

        let rate = (self.checked - self.prev_checked) / METRICS_PRINT_INTERVAL_S;
        self.prev_checked = self.checked;

        let elapsed = self.started_at.elapsed().as_secs();
        let elapsed = format!("{}:{:02}:{:02}", elapsed / 3600, elapsed / 60 % 60, elapsed % 60);

        if self.sequential {
            tracing::info!(
                "PROGRESS: [{}] CUR INDEX: {} RATE: {rate}/s ELAPSED: [{elapsed}] CHECKED: {}",
                self.progress(),
                self.latest_cursor,
                self.checked
            );
        } else {
            tracing::info!(
                "PROGRESS: DRAWN: {} RATE: {rate}/s ELAPSED: [{elapsed}]",
                self.checked
            );
        }
    }

    fn progress(&self) -> String {
        let total = self.range_end.saturating_sub(self.range_start);
        if total == 0 {
            return String::from("-");
        }
        let cur = self.latest_cursor.saturating_sub(self.range_start);
        // Widen before scaling; a resumed cursor can sit anywhere in u64.
        let perc = std::cmp::min(u128::from(cur) * 100 / u128::from(total), 100);
        format!("{perc:>2}%")
    }
}
