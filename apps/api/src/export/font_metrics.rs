//! Width tables for the two PDF core fonts the export uses.
//!
//! Widths are the standard Adobe AFM advance widths in 1/1000 em. Tables
//! cover ASCII 0x20..=0x7E; index = (char as usize) - 32. Anything else is
//! measured at `fallback_width`.

/// Core font faces. Both are standard-14 fonts, so no embedding is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Helvetica,
    HelveticaBold,
}

impl Face {
    pub fn base_font(self) -> &'static str {
        match self {
            Face::Helvetica => "Helvetica",
            Face::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name the page content streams refer to.
    pub fn resource_name(self) -> &'static str {
        match self {
            Face::Helvetica => "F1",
            Face::HelveticaBold => "F2",
        }
    }
}

pub struct FontMetricTable {
    widths: [u16; 95],
    fallback_width: u16,
}

impl FontMetricTable {
    /// Rendered width of `s` in points at `size_pt`.
    pub fn measure(&self, s: &str, size_pt: f32) -> f32 {
        let units: u32 = s
            .chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    u32::from(self.widths[code - 32])
                } else {
                    u32::from(self.fallback_width)
                }
            })
            .sum();
        units as f32 * size_pt / 1000.0
    }

    /// Greedy word wrap of one paragraph to `max_width_pt`.
    ///
    /// Words wider than a full line are split by character. An empty paragraph
    /// yields a single empty line so blank lines survive.
    pub fn wrap(&self, paragraph: &str, size_pt: f32, max_width_pt: f32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if self.measure(&candidate, size_pt) <= max_width_pt {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if self.measure(word, size_pt) <= max_width_pt {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    current.push(c);
                    if self.measure(&current, size_pt) > max_width_pt {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
        }

        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables
// ────────────────────────────────────────────────────────────────────────────

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    widths: [
        // sp    !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A-M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N-Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a-m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n-z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {    |    }    ~
        334, 260, 334, 584,
    ],
    fallback_width: 556,
};

static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    widths: [
        // sp    !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A-M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N-Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a-m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n-z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {    |    }    ~
        389, 280, 389, 584,
    ],
    fallback_width: 611,
};

pub fn get_metrics(face: Face) -> &'static FontMetricTable {
    match face {
        Face::Helvetica => &HELVETICA_TABLE,
        Face::HelveticaBold => &HELVETICA_BOLD_TABLE,
    }
}
