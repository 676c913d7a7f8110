//! Pipeline Invariant Tests
//!
//! End-to-end checks across analyzer, catalog, resolver, and assembler:
//! missing-identifier arithmetic, merge idempotency, wrapper policy, and
//! pass-through of unresolvable specifiers.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::analyze::{analyze_fragment, BUILTIN_GLOBALS};
    use crate::assemble::assemble;
    use crate::catalog::build_catalog;
    use crate::compile::{CompileOptions, FragmentCompiler};
    use crate::corpus::ProjectCorpus;
    use crate::types::{ImportInfo, ImportSpecifier, ProjectFile};

    fn corpus(files: Vec<ProjectFile>) -> ProjectCorpus {
        let mut deps = HashMap::new();
        deps.insert("react".to_string(), "^18.2.0".to_string());
        ProjectCorpus::new(files, deps, None)
    }

    const FRAGMENTS: &[&str] = &[
        "function Greet({name}) { return el('div', null, name); }",
        "const Card = ({title}) => <div>{title}</div>;",
        "import {useState} from 'react';\nexport default function Counter() { const [n, setN] = useState(0); return <b onClick={() => setN(n + 1)}>{n}</b>; }",
        "class Panel extends Component { render() { return <section>{helper(this.props)}</section>; } }",
    ];

    #[test]
    fn test_missing_subset_of_used_and_disjoint_from_builtins() {
        for fragment in FRAGMENTS {
            let ctx = analyze_fragment(fragment, None).unwrap();
            for missing in &ctx.missing_identifiers {
                assert!(
                    ctx.used_identifiers.contains(missing),
                    "{} not in used set for {:?}",
                    missing,
                    fragment
                );
                assert!(
                    !BUILTIN_GLOBALS.contains(missing.as_str()),
                    "builtin {} reported missing",
                    missing
                );
            }
        }
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let mut compiler = FragmentCompiler::new(corpus(vec![ProjectFile::new(
            "src/Button.tsx",
            "export function Button() { return <button />; }",
        )]));
        let fragment = "function Page() { return <Button />; }";
        let first = compiler.compile(fragment, &CompileOptions::default());
        let second = compiler.compile(fragment, &CompileOptions::default());
        assert_eq!(first.code, second.code);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn test_additional_import_already_present_is_not_duplicated() {
        let fragment =
            "import clsx from 'clsx';\nexport const Tag = ({on}) => <i className={clsx({on})} />;";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let additional = vec![ImportInfo::new(
            "clsx",
            vec![ImportSpecifier::default_import("clsx")],
        )];
        let unit = assemble(fragment, &ctx, &[], &additional, None, None);
        assert_eq!(unit.source.matches("from 'clsx'").count(), 1);
    }

    #[test]
    fn test_exported_fragment_never_wrapped_even_with_mock_props() {
        let fragment = "export default function Done() { return <div />; }";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let mock = serde_json::json!({"ignored": true});
        let unit = assemble(fragment, &ctx, &[], &[], Some(&mock), None);
        assert!(!unit.wrapped);
        assert!(!unit.source.contains("__Preview"));
    }

    #[test]
    fn test_detected_name_is_invoked_by_wrapper() {
        let fragment = "function Foo({x}) { return <div>{x}</div>; }";
        let ctx = analyze_fragment(fragment, None).unwrap();
        let unit = assemble(fragment, &ctx, &[], &[], None, None);
        assert!(unit.wrapped);
        assert!(unit.source.contains("<Foo />"));
    }

    // Example: bare fragment using a table-known helper gets the import and an
    // exporting wrapper.
    #[test]
    fn test_bare_fragment_with_known_helper() {
        let mut compiler = FragmentCompiler::new(corpus(vec![]));
        let result = compiler.compile(
            "function Greet({name}) { return el('div', null, name); }",
            &CompileOptions::default(),
        );
        assert!(result.success);
        let code = result.code.unwrap();
        assert!(code.contains("import { el } from 'redom';"));
        assert!(code.contains("export default function __Preview()"));
        assert!(code.contains("<Greet />"));
    }

    // Example: a self-contained fragment gains only the mandatory runtime
    // import.
    #[test]
    fn test_complete_fragment_gains_only_runtime_import() {
        let mut compiler = FragmentCompiler::new(corpus(vec![]));
        let fragment = "import {useState} from 'react';\nexport default function Counter() { const [n, setN] = useState(0); return <b>{n}</b>; }";
        let result = compiler.compile(fragment, &CompileOptions::default());
        assert!(result.success);

        let code = result.code.unwrap();
        assert!(!code.contains("__Preview"));
        let import_lines = code
            .lines()
            .filter(|l| l.trim_start().starts_with("import "))
            .count();
        // One original import plus the mandatory runtime default.
        assert_eq!(import_lines, 2);
        assert!(code.contains("import React from 'react';"));
    }

    // Example: one named export and one default export produce exactly two
    // catalog entries with the right default flags.
    #[test]
    fn test_catalog_named_and_default_entries() {
        let files = vec![
            ProjectFile::new(
                "src/Button.tsx",
                "export function Button({label}: {label: string}) { return <button>{label}</button>; }",
            ),
            ProjectFile::new(
                "src/Card.tsx",
                "export default function Card() { return <div />; }",
            ),
        ];
        let catalog = build_catalog(&files);
        assert_eq!(catalog.len(), 2);
        for entry in &catalog {
            assert_eq!(entry.is_default_export, entry.name == "Card");
        }
    }

    // Example: an unresolvable specifier is emitted as-is with a warning, not
    // an error.
    #[test]
    fn test_unresolvable_specifier_passes_through_with_warning() {
        let mut compiler = FragmentCompiler::new(corpus(vec![]));
        let result = compiler.compile(
            "import mystery from 'totally-unknown-pkg';\nexport default function X() { return <div>{mystery}</div>; }",
            &CompileOptions::default(),
        );
        assert!(result.success);
        assert!(result
            .code
            .as_ref()
            .unwrap()
            .contains("import mystery from 'totally-unknown-pkg';"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("totally-unknown-pkg")));
    }

    #[test]
    fn test_catalog_suggestion_produces_relative_import() {
        let mut compiler = FragmentCompiler::new(corpus(vec![ProjectFile::new(
            "src/components/Button.tsx",
            "export function Button({label}: {label: string}) { return <button>{label}</button>; }",
        )]));
        let options = CompileOptions {
            file_path: Some("src/pages/Home.tsx".to_string()),
            ..Default::default()
        };
        let result = compiler.compile(
            "function Home() { return <Button label=\"go\" />; }",
            &options,
        );
        assert!(result.success);
        let code = result.code.unwrap();
        assert!(code.contains("import { Button } from '../components/Button';"));
    }

    #[test]
    fn test_suggestion_miss_surfaces_as_warning() {
        let mut compiler = FragmentCompiler::new(corpus(vec![]));
        let result = compiler.compile(
            "function Mystery() { return <div>{conjure()}</div>; }",
            &CompileOptions::default(),
        );
        assert!(result.success);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("No import suggestion") && w.contains("conjure")));
    }
}
