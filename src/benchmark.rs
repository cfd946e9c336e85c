use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    MetadataExtraction,
    ApiFetch,
    GenreInference,
    TagUpdate,
    FileMove,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::MetadataExtraction,
        Phase::ApiFetch,
        Phase::GenreInference,
        Phase::TagUpdate,
        Phase::FileMove,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Phase::MetadataExtraction => "Metadata Extraction",
            Phase::ApiFetch => "Api Fetch",
            Phase::GenreInference => "Genre Inference",
            Phase::TagUpdate => "Tag Update",
            Phase::FileMove => "File Move",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Time spent on one folder, split by phase.
#[derive(Debug, Clone, Default)]
pub struct BookTiming {
    pub folder_name: String,
    pub total: Duration,
    pub file_count: usize,
    phases: [Duration; 5],
}

impl BookTiming {
    pub fn new(folder_name: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, phase: Phase, elapsed: Duration) {
        self.phases[phase.index()] += elapsed;
    }

    pub fn phase(&self, phase: Phase) -> Duration {
        self.phases[phase.index()]
    }

    pub fn time<T>(&mut self, phase: Phase, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = f();
        self.add(phase, started.elapsed());
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub total_duration: Duration,
    pub books_processed: usize,
    pub audio_files: usize,
    pub total_processing: Duration,
    pub average_per_book: Duration,
    pub throughput_per_second: f64,
    pub fastest: Option<(String, Duration)>,
    pub slowest: Option<(String, Duration)>,
    pub breakdown: Vec<(Phase, Duration)>,
}

/// Collects per-folder timings from all workers.
#[derive(Debug)]
pub struct Benchmark {
    started: Instant,
    books: Mutex<Vec<BookTiming>>,
}

impl Default for Benchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl Benchmark {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            books: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, timing: BookTiming) {
        self.books
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timing);
    }

    pub fn summary(&self) -> BenchmarkSummary {
        let total_duration = self.started.elapsed();
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);

        let books_processed = books.len();
        let audio_files = books.iter().map(|book| book.file_count).sum();
        let total_processing: Duration = books.iter().map(|book| book.total).sum();
        let average_per_book = u32::try_from(books_processed)
            .ok()
            .filter(|count| *count > 0)
            .map(|count| total_processing / count)
            .unwrap_or_default();
        let throughput_per_second = if total_duration.as_secs_f64() > 0.0 {
            books_processed as f64 / total_duration.as_secs_f64()
        } else {
            0.0
        };
        let fastest = books
            .iter()
            .min_by_key(|book| book.total)
            .map(|book| (book.folder_name.clone(), book.total));
        let slowest = books
            .iter()
            .max_by_key(|book| book.total)
            .map(|book| (book.folder_name.clone(), book.total));
        let breakdown = Phase::ALL
            .iter()
            .map(|phase| (*phase, books.iter().map(|book| book.phase(*phase)).sum()))
            .collect();

        BenchmarkSummary {
            total_duration,
            books_processed,
            audio_files,
            total_processing,
            average_per_book,
            throughput_per_second,
            fastest,
            slowest,
            breakdown,
        }
    }

    pub fn emit_summary(&self) {
        let summary = self.summary();

        info!("Performance benchmark summary");
        info!("Total duration: {:.2}s", summary.total_duration.as_secs_f64());
        info!("Audiobooks processed: {}", summary.books_processed);
        info!("Audio files: {}", summary.audio_files);
        info!(
            "Average time per book: {:.2}s",
            summary.average_per_book.as_secs_f64()
        );
        info!("Throughput: {:.2} books/sec", summary.throughput_per_second);

        if let (Some((fast_name, fast)), Some((slow_name, slow))) =
            (&summary.fastest, &summary.slowest)
        {
            info!("Fastest book: {fast_name} ({:.2}s)", fast.as_secs_f64());
            info!("Slowest book: {slow_name} ({:.2}s)", slow.as_secs_f64());
        }

        let total = summary.total_processing.as_secs_f64();
        for (phase, elapsed) in &summary.breakdown {
            let share = if total > 0.0 {
                elapsed.as_secs_f64() / total * 100.0
            } else {
                0.0
            };
            info!(
                "  {}: {:.2}s ({share:.1}%)",
                phase.label(),
                elapsed.as_secs_f64()
            );
        }
    }
}
