use colored::*;
use recce_core::hunter::{GENERIC_PATHS, TECH_PATHS};
use recce_core::rules::BUILTIN;

use crate::mprint;
use crate::terminal::{colors, print};

pub fn rules(quiet: u8) {
    for (idx, rule) in BUILTIN.iter().enumerate() {
        print::tree_head(idx, rule.name);
        print::as_tree_one_level(vec![
            ("On".to_string(), rule.trigger.as_str().color(colors::ACCENT)),
            ("Does".to_string(), rule.description.normal()),
        ]);
        mprint!();
    }

    print::header("file checklists", quiet);
    print::set_key_width(TECH_PATHS.iter().map(|(tech, _)| tech.len()).chain([7]).max().unwrap_or(7));
    print::aligned_line("Generic", &GENERIC_PATHS.join(", "));
    for (tech, paths) in TECH_PATHS {
        print::aligned_line(tech, &paths.join(", "));
    }
}
