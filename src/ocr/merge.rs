//! Merging of adjacent OCR words into multi-word labels.
//!
//! OCR engines report captions word by word. Words are ordered by row bucket
//! then x, and folded left to right: a word joins the current group when it
//! is close to the group's last word, otherwise it starts a new group.

use super::Label;

/// Default merge distance in pixels.
pub const DEFAULT_MERGE_DISTANCE: i32 = 50;

/// Merge adjacent labels.
///
/// Labels are sorted by `(y // distance, x)`. A label continues the current
/// group when `|dy| < distance` and `dx < 2 * distance` against the group's
/// last member (`dx` is signed). Each group becomes one label with the member
/// texts joined by spaces, the floor mean of the positions and the mean
/// confidence.
pub fn merge_labels(labels: &[Label], distance: i32) -> Vec<Label> {
    let distance = distance.max(1);

    let mut sorted: Vec<&Label> = labels.iter().collect();
    sorted.sort_by_key(|l| (l.y.div_euclid(distance), l.x));

    let mut merged = Vec::new();
    let mut group: Vec<&Label> = Vec::new();

    for label in sorted {
        if let Some(last) = group.last() {
            let same_line = (label.y - last.y).abs() < distance;
            let close_x = label.x - last.x < distance * 2;
            if !(same_line && close_x) {
                merged.push(collapse(&group));
                group.clear();
            }
        }
        group.push(label);
    }

    if !group.is_empty() {
        merged.push(collapse(&group));
    }

    merged
}

fn collapse(group: &[&Label]) -> Label {
    let n = group.len() as i64;
    let text = group.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join(" ");
    let sum_x: i64 = group.iter().map(|l| l.x as i64).sum();
    let sum_y: i64 = group.iter().map(|l| l.y as i64).sum();
    let confidence = group.iter().map(|l| l.confidence).sum::<f64>() / group.len() as f64;

    Label { text, x: sum_x.div_euclid(n) as i32, y: sum_y.div_euclid(n) as i32, confidence }
}
