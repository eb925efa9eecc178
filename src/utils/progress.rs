use indicatif::{ProgressBar, ProgressStyle};

use crate::copier::ProgressInformation;

/// Console progress bar driven by copier progress callbacks
pub struct ProgressTracker {
    bar: ProgressBar,
    current_image: Option<usize>,
}

impl ProgressTracker {
    pub fn new(description: &str) -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tiles ({eta}) {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(description.to_string());

        ProgressTracker {
            bar,
            current_image: None,
        }
    }

    /// Updates the bar from one copier progress report
    pub fn update(&mut self, info: &ProgressInformation) {
        if self.current_image != Some(info.image_index) {
            self.current_image = Some(info.image_index);
            self.bar.set_length(info.tile_count as u64);
            self.bar.set_message(format!("image {}/{}", info.image_index + 1, info.image_count));
        }
        self.bar.set_position(info.tile_index as u64 + 1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }

    pub fn abandon(&self, msg: &str) {
        self.bar.abandon_with_message(msg.to_string());
    }
}
