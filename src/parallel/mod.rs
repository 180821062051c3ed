//! Worker sizing for the scan pipeline
//!
//! The scanner asks this module how many counter threads to run. The answer
//! depends only on system resources and user configuration:
//!
//! ```text
//! max_threads > 0  → min(max_threads, cores * thread_percentage / 100)
//! max_threads == 0 → cores * thread_percentage / 100
//! ```
//!
//! The result is never below one.
//!
//! ```rust
//! use dirwatch::parallel::calculate_optimal_workers;
//!
//! assert_eq!(calculate_optimal_workers(1, 75), 1);
//! assert!(calculate_optimal_workers(0, 100) >= 1);
//! ```

/// Calculate the worker count from the thread limit and CPU share
pub fn calculate_optimal_workers(max_threads: usize, thread_percentage: u8) -> usize {
    calculate_for_cores(num_cpus::get(), max_threads, thread_percentage)
}

fn calculate_for_cores(cpu_cores: usize, max_threads: usize, thread_percentage: u8) -> usize {
    // Apply thread percentage from config
    let max_by_percentage = std::cmp::max(1, (cpu_cores * thread_percentage as usize) / 100);

    // Apply max_threads limit if specified (0 means use percentage calculation)
    if max_threads > 0 {
        std::cmp::min(max_threads, max_by_percentage)
    } else {
        max_by_percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_of_cores() {
        assert_eq!(calculate_for_cores(16, 0, 75), 12);
        assert_eq!(calculate_for_cores(4, 0, 50), 2);
    }

    #[test]
    fn test_max_threads_caps_percentage() {
        assert_eq!(calculate_for_cores(16, 4, 75), 4);
        assert_eq!(calculate_for_cores(2, 8, 100), 2);
    }

    #[test]
    fn test_never_below_one() {
        assert_eq!(calculate_for_cores(1, 0, 10), 1);
        assert_eq!(calculate_for_cores(1, 1, 1), 1);
        assert!(calculate_optimal_workers(0, 1) >= 1);
    }
}
