//! Operation: search the registry for modules.

use modkit_forge::api::SearchResult;
use modkit_forge::ForgeClient;

/// Query the registry for modules matching `term`.
pub async fn search(client: &ForgeClient, term: &str) -> miette::Result<Vec<SearchResult>> {
    let sp = modkit_util::progress::spinner(&format!("Searching {} ...", client.repository().url));
    let results = client.search(term).await;
    sp.finish_and_clear();
    let results = results?;
    tracing::debug!("{} result(s) for '{term}'", results.len());
    Ok(results)
}

/// Render search results as an aligned table.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.\n".to_string();
    }
    let rows: Vec<[String; 4]> = results
        .iter()
        .map(|r| {
            [
                r.full_name.clone(),
                r.version.clone(),
                r.summary.clone(),
                r.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "),
            ]
        })
        .collect();

    let header = ["NAME", "VERSION", "DESCRIPTION", "KEYWORDS"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(header.map(str::to_string)).chain(rows) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(full_name: &str, summary: &str, tags: &[&str]) -> SearchResult {
        let (author, name) = full_name.split_once('-').unwrap();
        SearchResult {
            full_name: full_name.to_string(),
            author: author.to_string(),
            name: name.to_string(),
            version: "1.0.0".to_string(),
            summary: summary.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            project_url: None,
        }
    }

    #[test]
    fn aligns_columns() {
        let table = format_results(&[
            hit("puppetlabs-stdlib", "Standard library", &["stdlib", "functions"]),
            hit("a-b", "", &[]),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME               VERSION"));
        assert!(lines[1].ends_with("#stdlib #functions"));
        assert_eq!(lines[2], "a-b                1.0.0");
    }

    #[test]
    fn empty_results() {
        assert_eq!(format_results(&[]), "No results found.\n");
    }
}
