use std::collections::BTreeMap;
use std::fmt;
use std::time;

/// Accumulating stopwatches keyed by section name.
pub struct Timing {
    sections: BTreeMap<String, SectionTimer>,
}

struct SectionTimer {
    start: time::Instant,
    duration: time::Duration,
    count: u32,
}

impl Timing {
    pub fn new() -> Self {
        Timing {
            sections: BTreeMap::new(),
        }
    }

    pub fn start(&mut self, name: &str) {
        let now = time::Instant::now();
        let entry = self
            .sections
            .entry(name.to_string())
            .or_insert_with(|| SectionTimer {
                start: now,
                duration: time::Duration::from_millis(0),
                count: 0,
            });

        entry.start = now;
    }

    /// Stopping a section that was never started is a no-op.
    pub fn stop(&mut self, name: &str) {
        if let Some(timer) = self.sections.get_mut(name) {
            timer.duration += timer.start.elapsed();
            timer.count += 1;
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "timing:")?;
        for (name, timer) in &self.sections {
            let secs = timer.duration.as_secs_f64();
            write!(f, " {}={:.4}s", name, secs)?;
            if timer.count > 1 {
                write!(f, " ({:.6}s avg over {})", secs / timer.count as f64, timer.count)?;
            }
        }
        Ok(())
    }
}
