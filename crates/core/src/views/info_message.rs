use serde::{Deserialize, Serialize};

/// Summary of spans skipped above a row: out of the view window, filtered
/// out, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoMessage {
    pub out_of_view: Option<usize>,
    pub filtered_out: Option<usize>,
}

impl InfoMessage {
    pub fn fragments(&self) -> Vec<String> {
        let mut fragments = Vec::with_capacity(2);
        if let Some(n) = self.out_of_view {
            fragments.push(format!("{n} spans out of view"));
        }
        if let Some(n) = self.filtered_out {
            fragments.push(format!("{n} spans filtered out"));
        }
        fragments
    }
}

impl std::fmt::Display for InfoMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fragments().join(", "))
    }
}

/// Summarise the hidden/filtered counts carried into the current row.
///
/// The filtered fragment also requires the current span to be visible, even
/// though the two counts are otherwise independent.
pub fn generate_info_message(
    hidden_above: usize,
    filtered_above: usize,
    is_current_hidden: bool,
    is_current_filtered: bool,
) -> Option<InfoMessage> {
    let out_of_view = (!is_current_hidden && hidden_above > 0).then_some(hidden_above);
    let filtered_out = (!is_current_filtered && filtered_above > 0 && !is_current_hidden)
        .then_some(filtered_above);

    if out_of_view.is_none() && filtered_out.is_none() {
        return None;
    }
    Some(InfoMessage {
        out_of_view,
        filtered_out,
    })
}
