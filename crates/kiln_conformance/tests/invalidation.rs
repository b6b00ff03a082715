//! Which stages rerun after an input changes.

use std::fs;
use std::thread;
use std::time::Duration;

use filetime::{set_file_mtime, FileTime};
use kiln_cache::OutputStore;
use kiln_conformance::{Sandbox, SourceFixture};
use kiln_exec::Tool;
use kiln_pipeline::StageId;
use kiln_stages::codegen::{self, TEMPLATE};
use kiln_stages::layers::{self, LIB_3};
use kiln_stages::packager::{self, SCRIPT_ENGINE, SERVICES_DIR};
use kiln_stages::CompileError;

#[test]
fn touched_template_reruns_generation_and_everything_after() {
    let sandbox = Sandbox::new("1.0.0", &SourceFixture::kawa()).unwrap();
    let (mut pipeline, log) = sandbox.pipeline();
    pipeline.run().unwrap();

    // Make the template newer than every generated file without relying on
    // the clock.
    let src = sandbox.workspace().source_dir();
    let old = FileTime::from_unix_time(1_700_000_000, 0);
    for out in codegen::outputs(&src) {
        set_file_mtime(&out, old).unwrap();
    }
    set_file_mtime(src.join(TEMPLATE), FileTime::from_unix_time(1_700_000_060, 0)).unwrap();
    log.clear();

    let report = pipeline.run().unwrap();
    assert_eq!(
        report.executed().collect::<Vec<_>>(),
        vec![
            StageId::Generate,
            StageId::CompileCore,
            StageId::CompileLib,
            StageId::CompileSlib,
            StageId::Package,
        ]
    );
    assert_eq!(log.len(), 16 + 1 + 3 + 1);

    let again = pipeline.run().unwrap();
    assert!(again.is_noop());
}

#[test]
fn edited_library_source_reruns_later_layers_only() {
    let sandbox = Sandbox::new("1.0.0", &SourceFixture::kawa()).unwrap();
    let (mut pipeline, log) = sandbox.pipeline();
    pipeline.run().unwrap();
    log.clear();

    thread::sleep(Duration::from_millis(20));
    let edited = sandbox.workspace().source_dir().join("kawa/lib/srfi/8.scm");
    let mut text = fs::read_to_string(&edited).unwrap();
    text.push_str("(define x 1)\n");
    fs::write(&edited, text).unwrap();

    let report = pipeline.run().unwrap();
    assert_eq!(
        report.executed().collect::<Vec<_>>(),
        vec![StageId::CompileLib, StageId::CompileSlib, StageId::Package]
    );
    // lib-1 is skipped inside the stage; lib-2, lib-3 and slib recompile.
    let first_sources: Vec<_> = log
        .calls()
        .iter()
        .map(|inv| inv.sources[0].to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        first_sources,
        vec!["enums.scm", "kawa/quaternions.scm", "readtable.scm"]
    );
}

#[test]
fn layers_compile_in_fixed_order() {
    let sandbox = Sandbox::new("1.0.0", &SourceFixture::kawa()).unwrap();
    let (mut pipeline, log) = sandbox.pipeline();
    pipeline.run().unwrap();

    let kawa_calls: Vec<_> = log
        .calls()
        .into_iter()
        .filter(|inv| inv.tool == Tool::Java && inv.main_class.as_deref() == Some("kawa.repl"))
        .map(|inv| inv.sources[0].to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        kawa_calls,
        vec!["prim_imports.scm", "enums.scm", "kawa/quaternions.scm", "readtable.scm"]
    );

    let ws = sandbox.workspace();
    let store = OutputStore::load_or_create(&ws.state_dir(), &ws.classes_dir());
    assert_eq!(store.unit("kawa.lib.prim_imports").unwrap().layer, "lib-1");
    assert_eq!(store.unit("kawa.lib.kawa.pprint").unwrap().layer, "lib-3");
    assert_eq!(store.unit("gnu.kawa.slib.srfi1").unwrap().layer, "slib");
    assert_eq!(store.unit("gnu.lists.FVector").unwrap().layer, "core");
}

#[test]
fn later_layer_needs_earlier_output() {
    let sandbox = Sandbox::new("1.0.0", &SourceFixture::kawa()).unwrap();
    let (mut pipeline, _) = sandbox.pipeline();
    pipeline.run().unwrap();

    let prim = sandbox
        .workspace()
        .classes_dir()
        .join("kawa/lib/prim_imports.class");
    fs::remove_file(&prim).unwrap();

    let err = layers::compile_layer(pipeline.context(), &LIB_3).unwrap_err();
    match err {
        CompileError::Failed {
            layer, diagnostics, ..
        } => {
            assert_eq!(layer, "lib-3");
            assert!(diagnostics.contains("kawa/lib/prim_imports.class"));
        }
        other => panic!("expected compile failure, got {other:?}"),
    }

    // The missing unit also makes lib-1 stale.
    assert!(!layers::is_fresh(pipeline.context(), &layers::LIB_1));
    let report = pipeline.run().unwrap();
    assert!(report.executed().any(|s| s == StageId::CompileLib));
    assert!(prim.is_file());
}

#[test]
fn repackaging_appends_service_line_again() {
    let sandbox = Sandbox::new("1.0.0", &SourceFixture::kawa()).unwrap();
    let (mut pipeline, _) = sandbox.pipeline();
    pipeline.run().unwrap();

    let services = sandbox
        .workspace()
        .classes_dir()
        .join(SERVICES_DIR)
        .join(SCRIPT_ENGINE.service);
    assert_eq!(fs::read_to_string(&services).unwrap(), SCRIPT_ENGINE.line());

    packager::package(pipeline.context()).unwrap();
    let text = fs::read_to_string(&services).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], lines[1]);
    assert_eq!(lines[0], "kawa.standard.SchemeScriptEngineFactory #Scheme");
}
