// Benchmark for GraphLite SPARQL join throughput

use graphlite_sparql::{
    EngineConfig, Exp, Expr, MemoryStore, Node, OptimizationLevel, Quad, Query, QueryExecutor,
    Term,
};
use std::time::{Duration, Instant};

const PEOPLE: usize = 2_000;
const EDGES: usize = 10_000;
const RUNS: u32 = 5;

fn person(i: usize) -> Term {
    Term::iri(&format!("http://example.org/person/{}", i))
}

fn build_store(rng: &mut fastrand::Rng) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..PEOPLE {
        store.insert(Quad::new(
            person(i),
            Term::iri("http://example.org/age"),
            Term::integer(rng.i64(18..90)),
        ));
    }
    for _ in 0..EDGES {
        store.insert(Quad::new(
            person(rng.usize(0..PEOPLE)),
            Term::iri("http://example.org/knows"),
            person(rng.usize(0..PEOPLE)),
        ));
    }
    store
}

fn friends_of_friends() -> Query {
    let knows = || Node::iri("http://example.org/knows");
    Query::new(Exp::bgp(vec![
        Exp::triple(Node::var("a"), knows(), Node::var("b")),
        Exp::triple(Node::var("b"), knows(), Node::var("c")),
        Exp::triple(Node::var("c"), Node::iri("http://example.org/age"), Node::var("age")),
        Exp::filter(Expr::gt(Expr::var("age"), Expr::constant(Term::integer(80)))),
    ]))
}

fn optional_ages() -> Query {
    Query::new(Exp::optional(
        Exp::bgp(vec![Exp::triple(
            Node::var("a"),
            Node::iri("http://example.org/knows"),
            Node::var("b"),
        )]),
        Exp::bgp(vec![
            Exp::triple(Node::var("b"), Node::iri("http://example.org/age"), Node::var("age")),
            Exp::filter(Expr::lt(Expr::var("age"), Expr::constant(Term::integer(20)))),
        ]),
    ))
}

fn measure(name: &str, store: &MemoryStore, config: &EngineConfig, query: &Query) -> Duration {
    let executor = QueryExecutor::new(store).with_config(config.clone());
    let mut total = Duration::ZERO;
    let mut rows = 0;
    for _ in 0..RUNS {
        let start = Instant::now();
        let result = executor.execute(query.clone()).unwrap();
        total += start.elapsed();
        rows = result.len();
    }
    let average = total / RUNS;
    println!(
        "  {:<28} {:>8} rows  {:?} ({:.2} ms)",
        name,
        rows,
        average,
        average.as_secs_f64() * 1000.0
    );
    average
}

fn main() {
    println!("=== GraphLite SPARQL Join Throughput ===\n");

    let mut rng = fastrand::Rng::with_seed(42);
    let start = Instant::now();
    let store = build_store(&mut rng);
    println!("Loaded {} quads in {:?}\n", store.len(), start.elapsed());

    let optimized = EngineConfig::default();
    let naive = EngineConfig {
        optimization_level: OptimizationLevel::None,
        backjump: false,
        ..EngineConfig::default()
    };

    println!("Test 1: friends of friends older than 80");
    let fast = measure("optimized", &store, &optimized, &friends_of_friends());
    let slow = measure("no planning, no backjump", &store, &naive, &friends_of_friends());
    println!("  Speedup: {:.2}x\n", slow.as_secs_f64() / fast.as_secs_f64().max(f64::EPSILON));

    println!("Test 2: OPTIONAL with postponed filter");
    measure("optimized", &store, &optimized, &optional_ages());
}
