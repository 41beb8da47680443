//! Golden-value tests: forward/backward metrics and a-posteriori tables of a
//! two-state RSC code against exhaustive path enumeration.
//!
//! The reference file `tests/golden/two_state_rsc.json` holds the received
//! samples, the channel likelihood table derived from them, and one case per
//! termination policy (with and without a-priori input).
//!
//! Run: cargo test -p trellis-bcjr --test golden

use std::path::PathBuf;

use serde_json::Value;
use trellis_bcjr::{Bcjr, BcjrConfig, Boundary, Termination};
use trellis_core::{LogReal, LogRealFast, Real, Table};
use trellis_fsm::{Fsm, Rscc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_golden(filename: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/golden")
        .join(filename);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read golden file {}: {}", path.display(), e));
    serde_json::from_str(&contents)
        .unwrap_or_else(|e| panic!("failed to parse golden file {}: {}", path.display(), e))
}

fn table(value: &Value) -> Table<f64> {
    let rows = value
        .as_array()
        .expect("table must be an array of rows")
        .iter()
        .map(|row| {
            row.as_array()
                .expect("row must be an array")
                .iter()
                .map(|x| x.as_f64().expect("entry must be a number"))
                .collect()
        })
        .collect();
    Table::from_rows(rows).expect("golden table must be rectangular")
}

fn boundary(value: &Value) -> Boundary {
    match value.as_u64() {
        Some(s) => Boundary::State(s as usize),
        None => Boundary::Uniform,
    }
}

fn code(golden: &Value) -> Rscc {
    let generators: Vec<u32> = golden["generators"]
        .as_array()
        .expect("generators must be an array")
        .iter()
        .map(|g| g.as_u64().expect("generator must be an integer") as u32)
        .collect();
    Rscc::from_generators(&generators).expect("golden generators must be valid")
}

fn assert_table_close(name: &str, what: &str, actual: &Table<f64>, expected: &Table<f64>, tol: f64) {
    assert_eq!(actual.shape(), expected.shape(), "{name}: {what} shape");
    for r in 0..actual.rows() {
        for c in 0..actual.cols() {
            let (a, e) = (actual[(r, c)], expected[(r, c)]);
            assert!(
                (a - e).abs() <= tol,
                "{name}: {what}[{r}][{c}] = {a}, expected {e} (tolerance {tol})"
            );
        }
    }
}

/// Decode every golden case with representation `R` and compare.
fn check_policy<R: Real>(tol: f64) {
    let golden = load_golden("two_state_rsc.json");
    let fsm = code(&golden);
    let likelihoods = table(&golden["likelihoods"]);
    let tau = likelihoods.rows();
    assert_eq!(fsm.num_states(), 2);

    let cases = golden["cases"].as_array().expect("cases must be an array");
    assert!(!cases.is_empty());
    for case in cases {
        let name = case["name"].as_str().expect("case needs a name");
        let termination = Termination::Open {
            start: boundary(&case["termination"]["start"]),
            end: boundary(&case["termination"]["end"]),
        };
        let prior = (!case["prior"].is_null()).then(|| table(&case["prior"]));

        let mut bcjr = Bcjr::<R>::new(&fsm, tau, BcjrConfig::new(termination));
        let app = bcjr
            .decode(&likelihoods, prior.as_ref())
            .unwrap_or_else(|e| panic!("{name}: decode failed: {e}"));

        assert_table_close(name, "alpha", &bcjr.forward_metrics(), &table(&case["alpha"]), tol);
        assert_table_close(name, "beta", &bcjr.backward_metrics(), &table(&case["beta"]), tol);
        assert_table_close(name, "app_inputs", &app.inputs, &table(&case["app_inputs"]), tol);
        assert_table_close(name, "app_outputs", &app.outputs, &table(&case["app_outputs"]), tol);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn golden_f64() {
    check_policy::<f64>(1e-9);
}

#[test]
fn golden_logreal() {
    check_policy::<LogReal>(1e-9);
}

#[test]
fn golden_logreal_fast() {
    check_policy::<LogRealFast>(1e-5);
}

#[test]
fn golden_f32() {
    check_policy::<f32>(1e-5);
}

#[test]
fn golden_hard_decisions() {
    let golden = load_golden("two_state_rsc.json");
    let fsm = code(&golden);
    let likelihoods = table(&golden["likelihoods"]);
    let mut bcjr = Bcjr::<f64>::new(&fsm, likelihoods.rows(), BcjrConfig::default());
    let app = bcjr.decode(&likelihoods, None).unwrap();
    assert_eq!(app.hard_decisions(), vec![1, 0, 1, 1, 0, 1]);

    let mut terminated = Bcjr::<f64>::new(
        &fsm,
        likelihoods.rows(),
        BcjrConfig::new(Termination::zero_terminated()),
    );
    let app = terminated.decode(&likelihoods, None).unwrap();
    assert_eq!(app.hard_decisions(), vec![1, 0, 0, 1, 0, 0]);
}
