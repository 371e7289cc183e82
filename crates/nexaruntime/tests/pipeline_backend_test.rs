// crates/nexaruntime/tests/pipeline_backend_test.rs

mod common;

use common::{emitter, params, read_lines, Fixture};
use nexacore::{FlowError, ModuleError, Parameters};
use nexaruntime::backends::generate_script;
use nexaruntime::{Backend, PipelineBackend};
use serde_json::json;
use std::fs;

fn gen_use_fixture() -> Fixture {
    let mut fixture = Fixture::new();
    fixture
        .shell_module("gen", "", &["x"], json!({}))
        .shell_module("use", "", &[], json!({}))
        .connect("gen", "x", "use", "x");
    fixture
}

#[test]
fn test_generates_process_and_wiring_blocks() {
    let fixture = gen_use_fixture();
    let workflow = fixture.load();
    let gen_script = fs::canonicalize(fixture.path().join("modules/scripts/gen.sh")).unwrap();
    let use_script = fs::canonicalize(fixture.path().join("modules/scripts/use.sh")).unwrap();

    let script = generate_script(&workflow, None).unwrap();

    let expected = format!(
        r#"nextflow.enable.dsl=2

workflow {{
    gen_out = gen()
    use_out = use(gen_out.x)
}}

process gen {{
    output:
        path "x.json", emit: x
    script:
    """
    sh {gen} --output_dir .
    """
}}

process use {{
    input:
        path(x)
    script:
    """
    sh {use_} --input x ${{x}} --output_dir .
    """
}}
"#,
        gen = gen_script.display(),
        use_ = use_script.display()
    );
    assert_eq!(script, expected);
}

#[test]
fn test_generation_is_order_stable() {
    let mut fixture = Fixture::new();
    fixture
        .shell_module("p1", "", &["out"], json!({}))
        .shell_module("p2", "", &["out"], json!({}))
        .shell_module("merge", "", &["merged"], json!({}))
        // Declared out of alphabetical order on purpose
        .connect("p1", "out", "merge", "beta")
        .connect("p2", "out", "merge", "alpha");
    let workflow = fixture.load();

    let first = generate_script(&workflow, None).unwrap();
    let second = generate_script(&workflow, None).unwrap();
    assert_eq!(first, second);

    // Call arguments line up with the sorted input declarations
    assert!(first.contains("    merge_out = merge(p2_out.out, p1_out.out)"));
    let alpha = first.find("        path(alpha)").unwrap();
    let beta = first.find("        path(beta)").unwrap();
    assert!(alpha < beta);
    assert!(first.contains("--input alpha ${alpha} --input beta ${beta}"));
}

#[test]
fn test_params_reference_is_absolute() {
    let fixture = gen_use_fixture();
    let workflow = fixture.load();
    let (_bus, events) = emitter();
    let backend = PipelineBackend::new(fixture.workdir(), "nextflow", events);

    let script = backend
        .render(&workflow, &params(json!({ "temperature": 300 })))
        .unwrap();

    let expected = format!("--params {}", fixture.workdir().join("params.json").display());
    assert_eq!(script.matches(&expected).count(), 2);

    let without = backend.render(&workflow, &Parameters::new()).unwrap();
    assert!(!without.contains("--params"));
}

#[test]
fn test_script_is_mandatory() {
    let mut fixture = Fixture::new();
    fixture.definition("boxed", json!({ "id": "boxed", "container": "polymer:latest" }));
    let workflow = fixture.load();

    let err = generate_script(&workflow, None).unwrap_err();
    assert!(matches!(
        err,
        FlowError::Module(ModuleError::MissingScript(ref id)) if id == "boxed"
    ));
}

#[tokio::test]
async fn test_execute_invokes_engine() {
    let fixture = gen_use_fixture();
    let workflow = fixture.load();
    let engine = fixture.write_file(
        "fake_nextflow.sh",
        "printf '%s\\n' \"$@\" > engine_args.txt\necho 'N E X T F L O W'\n",
    );

    let (bus, events) = emitter();
    let mut rx = bus.subscribe();
    let backend = PipelineBackend::new(
        fixture.workdir(),
        format!("sh {}", engine.display()),
        events,
    );
    backend
        .execute(&workflow, &params(json!({ "temperature": 300 })))
        .await
        .unwrap();

    let script_path = fixture.workdir().join("main.nf");
    let params_path = fixture.workdir().join("params.json");
    assert!(script_path.exists());
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&params_path).unwrap()).unwrap();
    assert_eq!(written, json!({ "temperature": 300 }));

    // The engine runs inside the working directory
    let args = read_lines(fixture.workdir().join("engine_args.txt"));
    assert_eq!(
        args,
        vec![
            "run".to_string(),
            script_path.to_string_lossy().into_owned(),
            "-params-file".to_string(),
            params_path.to_string_lossy().into_owned(),
        ]
    );

    let event = rx.try_recv().unwrap();
    assert!(matches!(event, nexacore::ExecutionEvent::ScriptGenerated { .. }));
}

#[tokio::test]
async fn test_engine_failure_surfaces_engine_output() {
    let fixture = gen_use_fixture();
    let workflow = fixture.load();
    let engine = fixture.write_file(
        "failing_nextflow.sh",
        "echo 'ERROR ~ No such variable: gen_out' >&2\nexit 1\n",
    );

    let (_bus, events) = emitter();
    let backend = PipelineBackend::new(
        fixture.workdir(),
        format!("sh {}", engine.display()),
        events,
    );
    let err = backend
        .execute(&workflow, &Parameters::new())
        .await
        .unwrap_err();

    match err {
        FlowError::EngineFailed { stderr, status, .. } => {
            assert_eq!(stderr, "ERROR ~ No such variable: gen_out\n");
            assert_eq!(status.code(), Some(1));
        }
        other => panic!("expected EngineFailed, got {:?}", other),
    }
    assert!(!fixture.workdir().join("params.json").exists());
}
