use std::collections::BTreeMap;

use crate::geom::{BBoxPx, Quad, union_bbox};
use crate::model::TextCandidate;

const LEVEL_LINE: i32 = 4;
const LEVEL_WORD: i32 = 5;

type LineKey = (i32, i32, i32, i32);

struct TsvRow<'a> {
    level: i32,
    key: LineKey,
    bbox: BBoxPx,
    conf: f32,
    text: &'a str,
}

fn parse_row(row: &str) -> Option<TsvRow<'_>> {
    let cols = row.split('\t').collect::<Vec<_>>();
    if cols.len() < 11 {
        return None;
    }
    let level = cols[0].parse().ok()?;
    let page_num: i32 = cols[1].parse().unwrap_or(0);
    let block_num: i32 = cols[2].parse().unwrap_or(0);
    let par_num: i32 = cols[3].parse().unwrap_or(0);
    let line_num: i32 = cols[4].parse().unwrap_or(0);
    let bbox = BBoxPx {
        x: cols[6].parse().unwrap_or(0),
        y: cols[7].parse().unwrap_or(0),
        w: cols[8].parse().unwrap_or(0),
        h: cols[9].parse().unwrap_or(0),
    };
    let conf = cols[10].trim().parse().unwrap_or(-1.0);
    let text = cols.get(11).map(|value| value.trim()).unwrap_or("");
    Some(TsvRow {
        level,
        key: (page_num, block_num, par_num, line_num),
        bbox,
        conf,
        text,
    })
}

struct WordToken {
    text: String,
    bbox: BBoxPx,
    conf: f32,
    len: usize,
}

/// Groups tesseract TSV word rows into one candidate per text line.
///
/// Line confidence is the character-weighted mean of its words, rescaled from
/// tesseract's 0-100 range. Lines come out in page reading order.
pub(super) fn parse_tsv_candidates(tsv: &str) -> Vec<TextCandidate> {
    let mut word_map: BTreeMap<LineKey, Vec<WordToken>> = BTreeMap::new();

    for row in tsv.lines().skip(1).filter_map(parse_row) {
        if row.level != LEVEL_WORD || row.text.is_empty() || row.conf < 0.0 {
            continue;
        }
        word_map.entry(row.key).or_default().push(WordToken {
            text: row.text.to_string(),
            bbox: row.bbox,
            conf: row.conf,
            len: row.text.chars().count().max(1),
        });
    }

    let mut lines = Vec::new();
    for (_, mut words) in word_map {
        words.sort_by_key(|word| word.bbox.x);
        if let Some(line) = build_line(&words) {
            lines.push(line);
        }
    }
    lines
}

/// Line-level boxes from the same TSV, used for tilt estimation.
pub(super) fn parse_tsv_regions(tsv: &str) -> Vec<Quad> {
    tsv.lines()
        .skip(1)
        .filter_map(parse_row)
        .filter(|row| row.level == LEVEL_LINE && row.bbox.w > 0 && row.bbox.h > 0)
        .map(|row| Quad::from_bbox(&row.bbox))
        .collect()
}

fn build_line(words: &[WordToken]) -> Option<TextCandidate> {
    let first = words.first()?;
    let mut bbox = first.bbox;
    let mut conf_sum = 0.0f32;
    let mut len_sum = 0usize;
    for word in words {
        bbox = union_bbox(&bbox, &word.bbox);
        conf_sum += word.conf * word.len as f32;
        len_sum += word.len;
    }
    let text = words
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let conf = conf_sum / len_sum.max(1) as f32 / 100.0;
    Some(TextCandidate::new(text, conf, bbox))
}
