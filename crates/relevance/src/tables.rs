//! Static heuristic tables. Immutable for the lifetime of the process.

/// Signed weight added when a path segment or file stem contains the keyword.
pub(crate) const KEYWORD_WEIGHTS: &[(&str, f64)] = &[
    // core building blocks
    ("main", 20.0),
    ("index", 15.0),
    ("app", 15.0),
    ("core", 15.0),
    ("api", 15.0),
    ("service", 12.0),
    ("controller", 12.0),
    ("model", 10.0),
    ("interface", 10.0),
    ("type", 8.0),
    ("schema", 10.0),
    ("config", 8.0),
    ("util", 5.0),
    ("helper", 5.0),
    ("lib", 10.0),
    ("common", 8.0),
    ("component", 10.0),
    ("module", 8.0),
    ("route", 10.0),
    ("middleware", 10.0),
    // supporting material
    ("test", 3.0),
    ("spec", 3.0),
    ("mock", 2.0),
    ("example", 2.0),
    // noise
    ("deprecated", -20.0),
    ("legacy", -15.0),
    ("temp", -10.0),
    ("tmp", -10.0),
    ("node_modules", -30.0),
    ("dist", -20.0),
    ("build", -15.0),
    ("coverage", -20.0),
];

/// File stems that are almost always entry points.
pub(crate) const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server", "api"];

/// Directory names that mark the main source tree.
pub(crate) const SOURCE_ROOTS: &[&str] = &["src", "lib"];

pub(crate) fn keyword_weight(segment: &str) -> f64 {
    let segment = segment.to_lowercase();
    KEYWORD_WEIGHTS
        .iter()
        .filter(|(keyword, _)| segment.contains(keyword))
        .map(|(_, weight)| weight)
        .sum()
}

/// Base score for a file extension (without the dot, any case).
pub(crate) fn extension_score(ext: &str) -> f64 {
    match ext.to_lowercase().as_str() {
        "ts" => 90.0,
        "tsx" => 85.0,
        "js" | "py" | "go" | "rs" => 80.0,
        "java" | "cs" => 75.0,
        "cpp" | "c" => 70.0,
        "h" | "hpp" => 65.0,
        "json" | "yaml" | "yml" => 60.0,
        "md" => 50.0,
        "txt" => 40.0,
        "log" => 20.0,
        "lock" => 10.0,
        _ => 30.0,
    }
}
