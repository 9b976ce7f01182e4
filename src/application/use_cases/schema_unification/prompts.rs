use super::types::FileSnapshot;

pub(crate) fn build_system_prompt() -> String {
    "You are a data engineer merging tabular files that describe the same kind of records. \
Different files may name the same column differently (for example \"e-mail\", \"Email Address\" and \"mail\"). \
Choose one clear snake_case name for every distinct column and map each file's original column names onto those names. \
Columns that hold different information must keep different names. \
Return JSON with keys: unified_columns (array of unified names in a sensible order) and \
mappings (object keyed by file name; each value maps every original column name of that file to its unified name). \
Use the file names and original column names exactly as given. Return only JSON."
        .to_string()
}

pub(crate) fn build_user_prompt(files: &[FileSnapshot]) -> String {
    let mut body = String::new();
    body.push_str(&format!("Files to merge: {}\n", files.len()));

    for file in files {
        body.push_str(&format!("\nFile: {}\n", file.name));
        body.push_str("Columns:\n");
        for header in &file.headers {
            body.push_str("- ");
            body.push_str(header);
            body.push('\n');
        }

        if !file.sample.is_empty() {
            body.push_str("Sample rows:\n");
            for row in &file.sample {
                let cells: Vec<String> = row.iter().map(|v| truncate(v, 60)).collect();
                body.push_str("| ");
                body.push_str(&cells.join(" | "));
                body.push_str(" |\n");
            }
        }
    }

    body
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push('…');
    out
}
