use std::fmt;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};

use crate::file_utils::FileManager;

// @module: Subtitle generation and SRT handling

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,}:\d{2}:\d{2},\d{3}) --> (\d{2,}:\d{2}:\d{2},\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self> {
        if end_time_ms <= start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow!("Empty subtitle text for entry {}", seq_num));
        }

        Ok(SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: trimmed_text.to_string(),
        })
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        // Parse HH:MM:SS,mmm format
        let parts: Vec<&str> = timestamp.split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm).
    /// Minutes and hours roll over; there is no cap on track length.
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Greedy word wrap.
///
/// Lines are filled word by word and never exceed `max_width` characters.
/// Words are kept whole unless a single word is itself longer than
/// `max_width`: such a word starts a new line and is cut into
/// `max_width`-sized pieces.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }

        if current_len > max_width {
            // Only an oversized word on a fresh line gets here
            let chars: Vec<char> = current.chars().collect();
            let mut pieces = chars.chunks(max_width).map(|c| c.iter().collect::<String>());
            let last = pieces.next_back().unwrap_or_default();
            lines.extend(pieces);
            current_len = last.chars().count();
            current = last;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Collection of subtitle entries with metadata
#[derive(Debug)]
pub struct SubtitleCollection {
    /// File the collection was written to or read from
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Build a track from plain text: one entry per wrapped line, each shown
    /// for `line_duration_ms`, back to back starting at zero.
    pub fn from_text(text: &str, max_width: usize, line_duration_ms: u64, source_file: PathBuf) -> Result<Self> {
        if max_width == 0 {
            return Err(anyhow!("Subtitle line width must be at least 1 character"));
        }
        if line_duration_ms == 0 {
            return Err(anyhow!("Subtitle line duration must be positive"));
        }

        let lines = wrap_text(text, max_width);
        if lines.is_empty() {
            return Err(anyhow!("No subtitle text to generate from"));
        }

        let entries = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let start = i as u64 * line_duration_ms;
                SubtitleEntry::new(i + 1, start, start + line_duration_ms, line)
            })
            .collect();

        Ok(SubtitleCollection { source_file, entries })
    }

    /// Generate a subtitle track from text and write it as SRT to `output_path`
    pub fn generate<P: AsRef<Path>>(
        text: &str,
        max_width: usize,
        line_duration_ms: u64,
        output_path: P,
    ) -> Result<Self> {
        let output_path = output_path.as_ref();
        let collection = Self::from_text(text, max_width, line_duration_ms, output_path.to_path_buf())?;
        collection.write_to_srt(output_path)?;

        // Confirm the file parses back to the same entries
        let written = Self::read_srt_file(output_path)?;
        if written.entries != collection.entries {
            return Err(anyhow!(
                "Subtitle file {} does not read back as written ({} of {} entries)",
                output_path.display(),
                written.entries.len(),
                collection.entries.len()
            ));
        }

        debug!(
            "Generated {} subtitle line(s) covering {}",
            collection.entries.len(),
            SubtitleEntry::format_timestamp(collection.total_duration_ms())
        );

        Ok(collection)
    }

    /// End time of the last entry
    pub fn total_duration_ms(&self) -> u64 {
        self.entries.last().map(|e| e.end_time_ms).unwrap_or(0)
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        FileManager::ensure_parent_dir(path)?;

        let mut file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

        for entry in &self.entries {
            write!(file, "{}", entry)?;
        }

        Ok(())
    }

    /// Read an SRT file back into a collection
    pub fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let entries = Self::parse_srt_string(&content)?;

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries,
        })
    }

    /// Parse SRT format string into subtitle entries
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        let mut entries = Vec::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut add_current_entry = |seq_num: usize, start_ms: u64, end_ms: u64, text: &str| {
            match SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text.to_string()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping invalid subtitle entry {}: {}", seq_num, e),
            }
        };

        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
                    if !current_text.is_empty() {
                        add_current_entry(seq_num, start_ms, end_ms, &current_text);
                        current_seq_num = None;
                        current_times = None;
                        current_text.clear();
                    }
                }
                continue;
            }

            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    match (
                        SubtitleEntry::parse_timestamp(&caps[1]),
                        SubtitleEntry::parse_timestamp(&caps[2]),
                    ) {
                        (Ok(start_ms), Ok(end_ms)) => current_times = Some((start_ms, end_ms)),
                        (Err(e), _) | (_, Err(e)) => {
                            warn!("Skipping entry with bad timestamp at line {}: {}", line_number + 1, e);
                            current_seq_num = None;
                        }
                    }
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_number + 1, trimmed);
            }
        }

        if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
            if !current_text.is_empty() {
                add_current_entry(seq_num, start_ms, end_ms, &current_text);
            }
        }

        if entries.is_empty() {
            return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
        }

        entries.sort_by_key(|entry| entry.start_time_ms);

        Ok(entries)
    }
}
