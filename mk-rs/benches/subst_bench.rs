use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mk::pattern::subst_pattern;
use mk::script::Evaluator;

fn make_words(n: usize) -> String {
    (0..n)
        .map(|i| format!("src/module{i}/file{i}.c"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn evaluator_with(words: &str) -> Evaluator {
    let mut ev = Evaluator::new();
    ev.exec_script(&format!("SRCS := {words}"), "bench.mk")
        .expect("assignment failed");
    ev
}

fn bench_text_functions(c: &mut Criterion) {
    let small = evaluator_with(&make_words(100));
    let large = evaluator_with(&make_words(10_000));

    let mut g = c.benchmark_group("text_functions");

    for (label, ev) in [("small", small), ("large", large)] {
        let mut ev = ev;
        for (name, expr) in [
            ("subst", "$(subst .c,.o,$(SRCS))"),
            ("patsubst", "$(patsubst src/%.c,obj/%.o,$(SRCS))"),
            ("subst_ref", "$(SRCS:.c=.o)"),
            ("filter", "$(filter %7.c %3.c,$(SRCS))"),
            ("sort", "$(sort $(SRCS))"),
            ("foreach", "$(foreach f,$(SRCS),$(notdir $(f)))"),
        ] {
            g.bench_function(format!("{name}_{label}"), |b| {
                b.iter(|| ev.expand_str(black_box(expr)).expect("expansion failed"))
            });
        }
    }

    g.finish();
}

fn bench_pattern(c: &mut Criterion) {
    let words = make_words(1000);
    c.bench_function("subst_pattern_words", |b| {
        b.iter(|| {
            words
                .split_ascii_whitespace()
                .map(|w| subst_pattern(black_box("%.c"), "%.o", w).len())
                .sum::<usize>()
        })
    });
}

criterion_group!(benches, bench_text_functions, bench_pattern);
criterion_main!(benches);
