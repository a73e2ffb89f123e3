use std::time::Duration;

/// Tuning for the notification surfaces.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Bell polling period.
    pub poll_interval: Duration,
    pub bell_page_size: u32,
    pub list_page_size: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            bell_page_size: 10,
            list_page_size: 20,
        }
    }
}
