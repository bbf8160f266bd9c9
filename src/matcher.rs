//! Sprite naming from OCR labels and prompt names.
//!
//! Sprites are visited in reading order. Each one greedily takes the nearest
//! label nobody has taken yet, if it is close enough. The label text is then
//! reconciled against the prompt names, which win over raw OCR spelling.
//! Sprites left without a label receive the prompt names nobody claimed, in
//! prompt order, and finally `unknown{n}`.
//!
//! The assignment is greedy and order dependent on purpose; it is not a
//! minimum-cost matching.

use std::fmt;

use crate::naming::{keys_overlap, normalize_name};
use crate::ocr::Label;
use crate::segment::Sprite;

/// Parameters for label matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// Row height for reading order
    pub row_bucket: u32,
    /// Labels at this distance or farther from a sprite center are ignored
    pub max_distance: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { row_bucket: 50, max_distance: 200.0 }
    }
}

/// Why a sprite got its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    /// Nearest OCR label text
    Ocr(String),
    /// Prompt entry taken by position (no labels at all)
    Prompt(String),
    /// Unclaimed prompt name handed to an unlabelled sprite
    Fallback,
    /// No label and no prompt name left
    NoMatch,
    /// No labels and the prompt ran out
    NoPrompt,
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Ocr(text) | Evidence::Prompt(text) => f.write_str(text),
            Evidence::Fallback => f.write_str("(fallback)"),
            Evidence::NoMatch => f.write_str("(no match)"),
            Evidence::NoPrompt => f.write_str("(no prompt)"),
        }
    }
}

/// A sprite and the name assigned to it.
#[derive(Debug, Clone)]
pub struct NamedSprite {
    pub sprite: Sprite,
    /// Normalized name used for files and counters
    pub name: String,
    pub evidence: Evidence,
}

/// Name every sprite.
///
/// With labels, runs greedy proximity matching followed by prompt fallback.
/// Without labels, the i-th sprite takes the i-th prompt name, or
/// `unknown{i+1}` once the prompt runs out. The result keeps the order of
/// `sprites`.
pub fn match_names(
    labels: &[Label],
    sprites: Vec<Sprite>,
    prompt_names: &[String],
    options: &MatchOptions,
) -> Vec<NamedSprite> {
    if labels.is_empty() {
        return assign_positionally(sprites, prompt_names);
    }

    let assignments = assign_by_labels(labels, &sprites, prompt_names, options);
    sprites
        .into_iter()
        .zip(assignments)
        .map(|(sprite, (name, evidence))| NamedSprite { sprite, name, evidence })
        .collect()
}

/// Prompt-order naming used when OCR produced nothing.
pub fn assign_positionally(sprites: Vec<Sprite>, prompt_names: &[String]) -> Vec<NamedSprite> {
    sprites
        .into_iter()
        .enumerate()
        .map(|(i, sprite)| match prompt_names.get(i) {
            Some(prompt) => NamedSprite {
                sprite,
                name: normalize_name(prompt),
                evidence: Evidence::Prompt(prompt.clone()),
            },
            None => NamedSprite {
                sprite,
                name: format!("unknown{}", i + 1),
                evidence: Evidence::NoPrompt,
            },
        })
        .collect()
}

/// Greedy label matching. Returns one `(name, evidence)` per sprite, in the
/// order of `sprites`.
fn assign_by_labels(
    labels: &[Label],
    sprites: &[Sprite],
    prompt_names: &[String],
    options: &MatchOptions,
) -> Vec<(String, Evidence)> {
    let prompt_keys: Vec<String> = prompt_names.iter().map(|p| normalize_name(p)).collect();

    let mut order: Vec<usize> = (0..sprites.len()).collect();
    order.sort_by_key(|&i| sprites[i].reading_key(options.row_bucket));

    let mut used = vec![false; labels.len()];
    // Reading-order slots: (sprite index, matched name and evidence)
    let mut slots: Vec<(usize, Option<(String, Evidence)>)> = Vec::with_capacity(order.len());

    for &idx in &order {
        let sprite = &sprites[idx];

        let mut best: Option<(usize, f64)> = None;
        for (li, label) in labels.iter().enumerate() {
            if used[li] {
                continue;
            }
            let dx = sprite.center_x as f64 - label.x as f64;
            let dy = sprite.center_y as f64 - label.y as f64;
            let distance = (dx * dx + dy * dy).sqrt();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((li, distance));
            }
        }

        match best {
            Some((li, distance)) if distance < options.max_distance => {
                used[li] = true;
                let text = &labels[li].text;
                let ocr_key = normalize_name(text);
                let name = prompt_keys
                    .iter()
                    .find(|key| keys_overlap(&ocr_key, key))
                    .cloned()
                    .unwrap_or(ocr_key);

                tracing::debug!(sprite = idx, label = %text, distance, name = %name, "matched label");
                slots.push((idx, Some((name, Evidence::Ocr(text.clone())))));
            }
            _ => {
                tracing::debug!(sprite = idx, "no label in range");
                slots.push((idx, None));
            }
        }
    }

    let mut unclaimed = prompt_keys;
    for (_, matched) in &slots {
        if let Some((name, _)) = matched {
            if let Some(pos) = unclaimed.iter().position(|k| k == name) {
                unclaimed.remove(pos);
            }
        }
    }

    let mut fallback = unclaimed.into_iter();
    let mut unmatched_seen = 0;
    let mut result: Vec<Option<(String, Evidence)>> = vec![None; sprites.len()];

    for (idx, matched) in slots {
        let assigned = match matched {
            Some(hit) => hit,
            None => {
                unmatched_seen += 1;
                match fallback.next() {
                    Some(name) => (name, Evidence::Fallback),
                    None => (format!("unknown{}", unmatched_seen), Evidence::NoMatch),
                }
            }
        };
        result[idx] = Some(assigned);
    }

    result.into_iter().flatten().collect()
}
