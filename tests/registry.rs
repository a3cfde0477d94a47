//! Registry file loading tests

use std::path::PathBuf;

use sigma::registry::{Endpoint, get_llm_endpoints, resolve_from, resolve_llm_endpoint};

fn write(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("llms.txt");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_loads_endpoints_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "# Project\n\n\
         Intro text with a [link](https://ignored.example)\n\n\
         ## LLM Endpoints\n\
         - [Alpha](https://alpha.example/api)\n\
         * [Beta] (http://beta.example/v1/chat)\n\
         - [Broken](ftp://beta.example)\n\n\
         ## Docs\n\
         - [Guide](https://docs.example)\n",
    );

    let endpoints = get_llm_endpoints(Some(&path)).unwrap();

    assert_eq!(
        endpoints,
        vec![
            Endpoint::new("Alpha", "https://alpha.example/api"),
            Endpoint::new("Beta", "http://beta.example/v1/chat"),
        ]
    );
}

#[test]
fn test_missing_file_yields_no_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");

    assert!(get_llm_endpoints(Some(&path)).unwrap().is_empty());

    let err = resolve_llm_endpoint(Some("any"), Some(&path)).unwrap_err();
    assert!(err.to_string().contains("does not define any LLM endpoints"));
}

#[test]
fn test_bundled_registry_lists_default_endpoints() {
    let endpoints = get_llm_endpoints(None).unwrap();
    let names: Vec<_> = endpoints.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["token.place", "OpenRouter"]);
}

#[test]
fn test_resolve_named_endpoint_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "## LLM Endpoints\n- [Alpha](https://alpha.example)\n- [Beta](https://beta.example)\n",
    );

    let endpoint = resolve_llm_endpoint(Some("  beta "), Some(&path)).unwrap();
    assert_eq!(endpoint.url, "https://beta.example");
}

#[test]
fn test_duplicate_names_resolve_to_last_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "## LLM Endpoints\n- [Local](http://old.example)\n- [local](http://new.example)\n",
    );
    let endpoints = get_llm_endpoints(Some(&path)).unwrap();

    assert_eq!(endpoints.len(), 2);
    let endpoint = resolve_from(&endpoints, Some("LOCAL"), None).unwrap();
    assert_eq!(endpoint.url, "http://new.example");
    assert_eq!(resolve_from(&endpoints, None, None).unwrap().url, "http://old.example");
}

#[test]
fn test_env_default_picks_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "## LLM Endpoints\n- [Alpha](https://alpha.example)\n- [Beta](https://beta.example)\n",
    );
    let endpoints = get_llm_endpoints(Some(&path)).unwrap();

    let endpoint = resolve_from(&endpoints, None, Some(" Beta ")).unwrap();
    assert_eq!(endpoint.name, "Beta");

    let err = resolve_from(&endpoints, None, Some("Gamma")).unwrap_err();
    assert!(err.to_string().contains("SIGMA_DEFAULT_LLM"));
    assert!(err.to_string().contains("Alpha, Beta"));
}
