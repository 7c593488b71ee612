// Phrase scoring — sentiment weighting and sliding-window phrase selection.

pub mod phrase;
pub mod sentiment;
