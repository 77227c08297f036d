// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storey naming for detected floors
//!
//! Pure presentation layer over an ascending elevation list. Users are
//! expected to confirm or rename the result.

/// Names for the storeys at and above ground level
const STOREY_NAMES: [&str; 6] = [
    "Ground Floor",
    "First Floor",
    "Second Floor",
    "Third Floor",
    "Fourth Floor",
    "Fifth Floor",
];

/// Floor counts above this assume the lowest floor is a basement.
///
/// Unverified heuristic. Leave as-is until the rule has a documented source.
pub const BASEMENT_INFERENCE_THRESHOLD: usize = 4;

/// Label for floor `index` (0 = lowest) out of `total` floors.
pub fn floor_label(index: usize, total: usize) -> String {
    let basements = usize::from(total > BASEMENT_INFERENCE_THRESHOLD);
    if index < basements {
        return format!("Basement {}", basements - index);
    }
    let level = index - basements;
    match STOREY_NAMES.get(level) {
        Some(name) => (*name).to_string(),
        None => format!("Level {}", level),
    }
}

/// Labels for `total` floors in ascending order.
pub fn label_floors(total: usize) -> Vec<String> {
    (0..total).map(|i| floor_label(i, total)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_buildings_start_at_ground() {
        assert_eq!(label_floors(1), vec!["Ground Floor"]);
        assert_eq!(
            label_floors(4),
            vec!["Ground Floor", "First Floor", "Second Floor", "Third Floor"]
        );
    }

    #[test]
    fn test_more_than_four_floors_assumes_basement() {
        let labels = label_floors(5);
        assert_eq!(labels[0], "Basement 1");
        assert_eq!(labels[1], "Ground Floor");
        assert_eq!(labels[4], "Third Floor");
    }

    #[test]
    fn test_falls_back_to_level_numbers() {
        let labels = label_floors(9);
        assert_eq!(labels[6], "Fifth Floor");
        assert_eq!(labels[7], "Level 6");
        assert_eq!(labels[8], "Level 7");
    }
}
