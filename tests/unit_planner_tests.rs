//! # Planner Module Unit Tests / Planner 模块单元测试
//!
//! Tests case discovery, ordering and the selection rules for paths,
//! groups, name prefixes and numeric prefixes.
//!
//! 测试用例发现、排序，以及路径、分组、名称前缀和数字前缀的选择规则。

mod common;

use common::{TestProject, case_toml};
use lab_grader::core::error::SelectionError;
use lab_grader::core::planner::{Selection, discover_cases, find_case, find_group, resolve_selection, sort_key};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn project_with(cases: &[(&str, &str)]) -> TestProject {
    let project = TestProject::new();
    for (dir, name) in cases {
        project.add_case(dir, &case_toml(name, 10.0, "[[run]]\ncommand = \"true\"\n"));
    }
    project
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn groups(entries: Vec<(&str, Vec<&str>)>) -> BTreeMap<String, Vec<String>> {
    entries
        .into_iter()
        .map(|(name, members)| (name.to_string(), members.iter().map(|m| m.to_string()).collect()))
        .collect()
}

#[cfg(test)]
mod discovery_tests {
    use super::*;

    #[test]
    fn test_numeric_prefixes_sort_numerically_first() {
        let project = project_with(&[
            ("10-ten", "Ten"),
            ("2-two", "Two"),
            ("extra", "Extra"),
            ("1-one", "One"),
            ("abc", "Abc"),
        ]);
        let found = discover_cases(&project.cases_dir()).unwrap();
        assert_eq!(names(&found), vec!["1-one", "2-two", "10-ten", "abc", "extra"]);
    }

    #[test]
    fn test_directories_without_config_are_skipped() {
        let project = project_with(&[("1-one", "One")]);
        std::fs::create_dir_all(project.cases_dir().join("2-not-a-case")).unwrap();
        project.write_file("tests/cases/stray.txt", "x");
        let found = discover_cases(&project.cases_dir()).unwrap();
        assert_eq!(names(&found), vec!["1-one"]);
    }

    #[test]
    fn test_missing_cases_dir() {
        let project = TestProject::new();
        let missing = project.root().join("nope");
        assert_eq!(
            discover_cases(&missing).unwrap_err(),
            SelectionError::CasesDirMissing(missing)
        );
    }

    #[test]
    fn test_sort_key() {
        assert!(sort_key("2-a") < sort_key("10-a"));
        assert!(sort_key("99-z") < sort_key("a"));
        assert!(sort_key("3-a") < sort_key("3-b"));
    }
}

#[cfg(test)]
mod case_selection_tests {
    use super::*;

    #[test]
    fn test_prefix_match_is_case_insensitive() {
        let project = project_with(&[("1-Hello", "Hello"), ("2-linker", "Linker")]);
        let found = find_case(&project.cases_dir(), "1-h", false).unwrap();
        assert_eq!(names(&[found]), vec!["1-Hello"]);
    }

    #[test]
    fn test_numeric_prefix_does_not_match_longer_numbers() {
        let project = project_with(&[("2-basic", "Basic"), ("22-advanced", "Advanced")]);
        let found = find_case(&project.cases_dir(), "2", true).unwrap();
        assert_eq!(names(&[found]), vec!["2-basic"]);

        let found = find_case(&project.cases_dir(), "22", true).unwrap();
        assert_eq!(names(&[found]), vec!["22-advanced"]);
    }

    #[test]
    fn test_plain_prefix_is_ambiguous_between_2_and_22() {
        let project = project_with(&[("2-basic", "Basic"), ("22-advanced", "Advanced")]);
        match find_case(&project.cases_dir(), "2", false).unwrap_err() {
            SelectionError::AmbiguousCase { query, candidates } => {
                assert_eq!(query, "2");
                assert_eq!(candidates, vec!["2-basic: Basic", "22-advanced: Advanced"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_match_errors() {
        let project = project_with(&[("1-one", "One")]);
        assert_eq!(
            find_case(&project.cases_dir(), "7", true).unwrap_err(),
            SelectionError::NoCaseWithNumber("7".to_string())
        );
        assert_eq!(
            find_case(&project.cases_dir(), "zzz", true).unwrap_err(),
            SelectionError::NoCase("zzz".to_string())
        );
    }

    #[test]
    fn test_selection_priority() {
        let paths = vec![PathBuf::from("/x")];
        assert_eq!(
            Selection::from_inputs(paths.clone(), Some("g".into()), Some("1".into()), false),
            Selection::Paths(paths)
        );
        assert_eq!(
            Selection::from_inputs(Vec::new(), Some("g".into()), Some("1".into()), false),
            Selection::Group("g".into())
        );
        assert_eq!(
            Selection::from_inputs(Vec::new(), None, Some("1".into()), true),
            Selection::Case {
                query: "1".into(),
                numeric_prefix: true
            }
        );
        assert_eq!(Selection::from_inputs(Vec::new(), None, None, false), Selection::All);
    }

    #[test]
    fn test_all_selects_every_case_in_order() {
        let project = project_with(&[("3-c", "C"), ("1-a", "A")]);
        let found = resolve_selection(&Selection::All, &project.cases_dir(), &BTreeMap::new()).unwrap();
        assert_eq!(names(&found), vec!["1-a", "3-c"]);
    }

    #[test]
    fn test_empty_cases_dir() {
        let project = TestProject::new();
        assert_eq!(
            resolve_selection(&Selection::All, &project.cases_dir(), &BTreeMap::new()).unwrap_err(),
            SelectionError::NoCases(project.cases_dir())
        );
    }

    #[test]
    fn test_explicit_paths_keep_only_case_dirs() {
        let project = project_with(&[("1-a", "A"), ("2-b", "B")]);
        let selection = Selection::Paths(vec![
            project.cases_dir().join("2-b"),
            project.cases_dir().join("missing"),
            project.cases_dir().join("1-a"),
        ]);
        let found = resolve_selection(&selection, &project.cases_dir(), &BTreeMap::new()).unwrap();
        assert_eq!(names(&found), vec!["2-b", "1-a"]);

        let none = Selection::Paths(vec![project.cases_dir().join("missing")]);
        assert_eq!(
            resolve_selection(&none, &project.cases_dir(), &BTreeMap::new()).unwrap_err(),
            SelectionError::NoValidPaths
        );
    }
}

#[cfg(test)]
mod group_selection_tests {
    use super::*;

    #[test]
    fn test_group_prefix_is_ambiguous() {
        let groups = groups(vec![("linkers", vec!["1"]), ("linker-extra", vec!["2"])]);
        match find_group(&groups, "link").unwrap_err() {
            SelectionError::AmbiguousGroup { candidates, .. } => {
                assert_eq!(candidates, vec!["linker-extra", "linkers"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        let (name, members) = find_group(&groups, "LINKERS").unwrap();
        assert_eq!(name, "linkers");
        assert_eq!(members, ["1".to_string()]);
    }

    #[test]
    fn test_unknown_group() {
        let groups = groups(vec![("basics", vec!["1"])]);
        assert_eq!(
            find_group(&groups, "adv").unwrap_err(),
            SelectionError::NoGroup("adv".to_string())
        );
    }

    #[test]
    fn test_group_members_use_numeric_prefix_in_declared_order() {
        let project = project_with(&[("2-basic", "Basic"), ("22-advanced", "Advanced"), ("3-other", "Other")]);
        let groups = groups(vec![("core", vec!["22", "2"])]);
        let found =
            resolve_selection(&Selection::Group("core".into()), &project.cases_dir(), &groups).unwrap();
        assert_eq!(names(&found), vec!["22-advanced", "2-basic"]);
    }

    #[test]
    fn test_empty_group() {
        let project = project_with(&[("1-a", "A")]);
        let groups = groups(vec![("empty", vec![])]);
        assert_eq!(
            resolve_selection(&Selection::Group("empty".into()), &project.cases_dir(), &groups).unwrap_err(),
            SelectionError::EmptyGroup("empty".to_string())
        );
    }

    #[test]
    fn test_group_member_that_does_not_exist() {
        let project = project_with(&[("1-a", "A")]);
        let groups = groups(vec![("core", vec!["9"])]);
        assert_eq!(
            resolve_selection(&Selection::Group("core".into()), &project.cases_dir(), &groups).unwrap_err(),
            SelectionError::NoCaseWithNumber("9".to_string())
        );
    }
}
