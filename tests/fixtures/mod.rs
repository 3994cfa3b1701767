//! Documents used by the live end-to-end tests.

/// A small document uploaded to a running server.
#[derive(Debug, Clone)]
pub struct TestDocumentFixture {
    pub filename: &'static str,
    pub contents: &'static str,
    /// Text the parsed markdown must contain.
    pub expected_text: &'static str,
    pub description: &'static str,
}

pub const TEST_FIXTURES: &[TestDocumentFixture] = &[
    TestDocumentFixture {
        filename: "one_page.txt",
        contents: "Quarterly Report\n\nRevenue grew twelve percent quarter over quarter.\n",
        expected_text: "Revenue grew twelve percent",
        description: "Single page of plain text",
    },
    TestDocumentFixture {
        filename: "table.csv",
        contents: "region,revenue\nnorth,120\nsouth,95\n",
        expected_text: "north",
        description: "Small CSV table",
    },
    TestDocumentFixture {
        filename: "page.html",
        contents: "<html><body><h1>Release Notes</h1><p>Version 2 ships today.</p></body></html>",
        expected_text: "Release Notes",
        description: "Minimal HTML page",
    },
];
