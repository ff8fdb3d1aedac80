//! Utility struct for measuring compilation time.

use time;

use self::time::Duration;

/// Tracks various compile-time statistics throughout the compiler.
pub struct CompilationStats {
    /// Running times for top-level compiler phases.
    pub phase_times: Vec<(String, Duration)>,
    /// Running times for individual transformation passes.
    pub pass_times: Vec<(String, Duration)>,
}

impl CompilationStats {
    pub fn new() -> CompilationStats {
        CompilationStats {
            phase_times: Vec::new(),
            pass_times: Vec::new(),
        }
    }

    /// Formats a duration for printing the statistics, in terms of milliseconds and microseconds.
    fn format_time(duration: &Duration) -> f64 {
        if duration.num_milliseconds() == 0 {
            if let Some(v) = duration.num_microseconds() {
                (v as f64) / 1000.0
            } else {
                0.0
            }
        } else {
            duration.num_milliseconds() as f64
        }
    }

    fn format_section(result: &mut String, title: &str, times: &[(String, Duration)]) {
        result.push_str(&format!("{}:\n", title));
        let mut total = Duration::milliseconds(0);
        for &(ref name, ref dur) in times.iter() {
            result.push_str(&format!(
                "\t{}: {:.3} ms\n",
                name,
                CompilationStats::format_time(dur)
            ));
            total = total + *dur;
        }
        result.push_str(&format!(
            "\t\x1b[0;32m{} Total\x1b[0m {} ms\n",
            title,
            CompilationStats::format_time(&total)
        ));
    }

    /// Returns pretty-printed statistics stored in `self`.
    pub fn pretty_print(&self) -> String {
        let mut result = String::new();
        CompilationStats::format_section(&mut result, "Spindle Phases", &self.phase_times);
        CompilationStats::format_section(&mut result, "Transformation Passes", &self.pass_times);
        result
    }
}

impl Default for CompilationStats {
    fn default() -> CompilationStats {
        CompilationStats::new()
    }
}
