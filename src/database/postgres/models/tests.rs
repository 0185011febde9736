use super::*;

fn search_result(title: &str, description: &str, distance: f64) -> DocumentSearchResult {
    DocumentSearchResult {
        id: 1,
        title: title.to_string(),
        description: description.to_string(),
        chunk: description.to_string(),
        distance,
    }
}

#[test]
fn context_entry_format() {
    let result = search_result("Soil Survey", "County-level soil erosion tables", 0.12);
    assert_eq!(
        result.context_entry(),
        "Soil Survey:\nCounty-level soil erosion tables"
    );
}

#[test]
fn similarity_from_distance() {
    let result = search_result("a", "b", 0.25);
    assert!((result.similarity() - 0.75).abs() < f64::EPSILON);
}

#[test]
fn new_document_accepts_owned_and_borrowed() {
    let doc = NewDocument::new("Title", String::from("Description"));
    assert_eq!(doc.title, "Title");
    assert_eq!(doc.description, "Description");
}
