/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Crate unit tests.

use super::*;
use std::num::NonZeroUsize;

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "{what}: expected {expected}, got {actual}"
    );
}

fn first_caret_column(pointer: &str) -> Option<usize> {
    pointer.chars().position(|ch| ch == '^').map(|idx| idx + 1)
}

fn empty() -> EvaluationContext {
    EvaluationContext::new()
}

fn pool_dimensions() -> DimensionSet {
    DimensionSet::new(8.0, 4.0, 1.5)
}

fn pool_variables() -> Vec<VariableDefinition> {
    vec![
        VariableDefinition::new("surface_m2", "longueur*largeur").with_label("Surface", "m2"),
        VariableDefinition::new("volume_m3", "surface_m2*profondeur").with_label("Volume", "m3"),
    ]
}

fn literal_line(quantity: f64, unit_cost: f64, margin_percent: f64) -> BoqLine {
    NewLine::new(CategoryId::new(), "line", &EngineConfig::default())
        .quantity(quantity)
        .unit_cost(unit_cost)
        .margin(margin_percent)
        .into_line(LineId::new())
}

// ---------------------------------------------------------------------------
// Expression evaluator
// ---------------------------------------------------------------------------

#[test]
fn evaluates_arithmetic_with_precedence() {
    assert_eq!(evaluate("2+3*4", &empty()), 14.0);
    assert_eq!(evaluate("2*(3+4)", &empty()), 14.0);
    assert_eq!(evaluate("10-4-3", &empty()), 3.0);
    assert_eq!(evaluate("8/4/2", &empty()), 1.0);
    assert_eq!(evaluate("-2*-3", &empty()), 6.0);
    assert_eq!(evaluate("+4 - -1", &empty()), 5.0);
    assert_eq!(evaluate("  .5 + 1e1 ", &empty()), 10.5);
}

#[test]
fn evaluates_builtin_rounding_functions() {
    let ctx = empty().with("surface", 10.0);
    assert_eq!(evaluate("CEIL(surface/2.4)", &ctx), 5.0);
    assert_eq!(evaluate("FLOOR(surface/2.4)", &ctx), 4.0);
    assert_eq!(evaluate("ROUND(2.5)", &ctx), 3.0);
    assert_eq!(evaluate("ROUND(-2.5)", &ctx), -3.0);
    assert_eq!(
        evaluate("ceil(1.2) + Floor(1.8) + round(2.4)", &ctx),
        5.0,
        "function names are case-insensitive"
    );
    assert_eq!(Func::from_name("round").map(Func::name), Some("ROUND"));
    assert_eq!(Func::from_name("sqrt"), None);
}

#[test]
fn resolves_identifiers_and_defaults_unknown_to_zero() {
    let ctx = empty().with("largeur", 4.0).with("épaisseur", 0.5);
    assert_eq!(evaluate("largeur * 2", &ctx), 8.0);
    assert_eq!(evaluate("épaisseur*2", &ctx), 1.0);
    assert_eq!(evaluate("missing*10", &empty()), 0.0);
    assert_eq!(evaluate("missing + 3", &empty()), 3.0);
}

#[test]
fn malformed_formulas_evaluate_to_zero() {
    for formula in ["", "   ", "2 +", "(2+3", "2 3", "FOO(2)", "CEIL(1, 2)", "CEIL()", "*4"] {
        assert_eq!(evaluate(formula, &empty()), 0.0, "formula {formula:?}");
        assert!(try_evaluate(formula, &empty()).is_err(), "formula {formula:?}");
    }
}

#[test]
fn deeply_nested_formulas_evaluate_to_zero() {
    let parens = format!("{}1{}", "(".repeat(200), ")".repeat(200));
    let signs = format!("{}1", "-".repeat(200));
    let calls = format!("{}1{}", "CEIL(".repeat(100), ")".repeat(100));
    for formula in [&parens, &signs, &calls] {
        assert_eq!(evaluate(formula, &empty()), 0.0);
        let err = try_evaluate(formula, &empty()).expect_err("nesting limit");
        assert!(err.message.contains("nested too deeply"), "{}", err.message);
    }

    let cache = FormulaCache::new(NonZeroUsize::new(4).expect("non-zero"));
    assert_eq!(cache.evaluate(&parens, &empty()), 0.0);
    let variables = vec![VariableDefinition::new("deep", signs.clone())];
    assert_eq!(
        resolve_context(&DimensionSet::default(), &variables).get("deep"),
        Some(0.0)
    );
}

#[test]
fn nesting_up_to_the_limit_still_evaluates() {
    let depth = MAX_NESTING_DEPTH;
    let parens = format!("{}2{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(evaluate(&parens, &empty()), 2.0);
    let signs = format!("{}3", "-".repeat(depth));
    assert_eq!(evaluate(&signs, &empty()), 3.0, "even number of signs");
}

#[test]
fn oversized_formulas_evaluate_to_zero() {
    for formula in [
        "(".repeat(50_000),
        format!("{}1", "-".repeat(50_000)),
        format!("{}1", "1+".repeat(50_000)),
    ] {
        assert_eq!(evaluate(&formula, &empty()), 0.0);
        let err = try_evaluate(&formula, &empty()).expect_err("length limit");
        assert!(err.message.contains("longer than"), "{}", err.message);
        assert_eq!(err.column, 0);
    }

    // Long flat chains below the limit are fine.
    let chain = format!("{}1", "1+".repeat(2000));
    assert!(chain.len() <= MAX_FORMULA_LEN);
    assert_eq!(evaluate(&chain, &empty()), 2001.0);
}

#[test]
fn engine_and_cache_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BoqEngine>();
    assert_send_sync::<FormulaCache>();

    let engine = BoqEngine::default();
    let ctx = empty().with("a", 2.0);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(engine.evaluate("a*21", &ctx), 42.0));
        }
    });
    assert_eq!(engine.cache_stats().entries, 1);
}

#[test]
fn division_by_zero_follows_ieee() {
    assert_eq!(evaluate("1/0", &empty()), f64::INFINITY);
    assert_eq!(evaluate("-1/0", &empty()), f64::NEG_INFINITY);
    assert!(evaluate("0/0", &empty()).is_nan());
    assert!(evaluate("missing/missing", &empty()).is_nan());
}

#[test]
fn evaluation_is_referentially_transparent() {
    let ctx = empty().with("a", 0.1).with("b", 0.2);
    let first = evaluate("a + b * 3 / 7", &ctx);
    let second = evaluate("a + b * 3 / 7", &ctx);
    assert_eq!(first.to_bits(), second.to_bits());
}

#[test]
fn reports_column_and_caret_for_missing_operand() {
    let err = parse_formula("2 +").expect_err("parse should fail");
    assert_eq!(err.column, 4);
    assert!(err.message.contains("expected expression"), "{}", err.message);
    assert_eq!(err.snippet, "2 +");
    assert_eq!(first_caret_column(&err.pointer), Some(err.column));
    assert!(err.to_string().contains("--> column 4"));
}

#[test]
fn reports_unclosed_parenthesis() {
    let err = parse_formula("(2+3").expect_err("parse should fail");
    assert_eq!(err.column, 5);
    assert!(err.message.contains("')'"), "{}", err.message);
}

#[test]
fn reports_unknown_function_at_its_name() {
    let err = parse_formula("1 + SQRT(4)").expect_err("parse should fail");
    assert_eq!(err.column, 5);
    assert!(err.message.contains("known function"), "{}", err.message);

    let err = parse_formula("ROUND(1, 2)").expect_err("parse should fail");
    assert!(err.message.contains("exactly one"), "{}", err.message);
}

#[test]
fn reports_trailing_input() {
    let err = parse_formula("2 3").expect_err("parse should fail");
    assert_eq!(err.column, 3);
    assert!(err.message.contains("trailing"), "{}", err.message);
}

#[test]
fn collects_referenced_identifiers() {
    let formula = parse_formula("CEIL(a*b) + a - 2").expect("formula should parse");
    let names: Vec<String> = formula.identifiers().into_iter().collect();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(formula.source(), "CEIL(a*b) + a - 2");
}

#[test]
fn formula_cache_parses_each_string_once() {
    let cache = FormulaCache::new(NonZeroUsize::new(2).expect("non-zero"));
    let ctx = empty().with("a", 2.0);

    assert_eq!(cache.evaluate("a+1", &ctx), 3.0);
    assert_eq!(cache.evaluate("a+1", &ctx), 3.0);
    assert_eq!(cache.evaluate("2 +", &ctx), 0.0);
    assert_eq!(cache.evaluate("2 +", &ctx), 0.0);

    let stats = cache.stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.entries, 2);

    assert_eq!(cache.evaluate("a*10", &ctx), 20.0);
    assert_eq!(cache.stats().entries, 2, "least recently used entry is evicted");

    cache.clear();
    assert_eq!(cache.stats(), CacheStats::default());
}

// ---------------------------------------------------------------------------
// Variable resolver
// ---------------------------------------------------------------------------

#[test]
fn resolves_variables_sequentially() {
    let ctx = resolve_context(&pool_dimensions(), &pool_variables());
    assert_eq!(ctx.get("longueur"), Some(8.0));
    assert_eq!(ctx.get("largeur"), Some(4.0));
    assert_eq!(ctx.get("profondeur"), Some(1.5));
    assert_eq!(ctx.get("surface_m2"), Some(32.0));
    assert_eq!(ctx.get("volume_m3"), Some(48.0));
    assert_eq!(ctx.len(), 5);
}

#[test]
fn forward_references_resolve_to_zero() {
    let variables = vec![
        VariableDefinition::new("a", "b*2"),
        VariableDefinition::new("b", "3"),
    ];
    let ctx = resolve_context(&DimensionSet::default(), &variables);
    assert_eq!(ctx.get("a"), Some(0.0));
    assert_eq!(ctx.get("b"), Some(3.0));
}

#[test]
fn later_definitions_overwrite_earlier_names() {
    let variables = vec![
        VariableDefinition::new("longueur", "longueur + 1"),
        VariableDefinition::new("double", "longueur * 2"),
    ];
    let ctx = resolve_context(&pool_dimensions(), &variables);
    assert_eq!(ctx.get("longueur"), Some(9.0));
    assert_eq!(ctx.get("double"), Some(18.0));
}

#[test]
fn resolve_context_is_pure() {
    let dims = DimensionSet::new(7.3, 3.1, 1.45);
    let variables = vec![
        VariableDefinition::new("s", "longueur*largeur/3"),
        VariableDefinition::new("v", "s*profondeur/7"),
    ];
    let first = resolve_context(&dims, &variables);
    let second = resolve_context(&dims, &variables);
    for (name, value) in first.iter() {
        let other = second.get(name).expect("same keys");
        assert_eq!(value.to_bits(), other.to_bits(), "variable {name}");
    }

    let cache = FormulaCache::new(NonZeroUsize::new(8).expect("non-zero"));
    assert_eq!(resolve_context_cached(&dims, &variables, &cache), first);
}

#[test]
fn resolve_variables_keeps_labels_and_order() {
    let resolved = resolve_variables(&pool_dimensions(), &pool_variables());
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].name, "surface_m2");
    assert_eq!(resolved[0].label, "Surface");
    assert_eq!(resolved[0].unit, "m2");
    assert_eq!(resolved[0].value, 32.0);
    assert_eq!(resolved[1].value, 48.0);

    let engine = BoqEngine::default();
    assert_eq!(engine.resolve_variables(&pool_dimensions(), &pool_variables()), resolved);
    engine.resolve_context(&pool_dimensions(), &pool_variables());
    let stats = engine.cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 2, "preview and context share parsed formulas");
}

#[test]
fn check_variables_reports_ordering_and_syntax_problems() {
    let variables = vec![
        VariableDefinition::new("a", "b*2"),
        VariableDefinition::new("b", "longueur"),
        VariableDefinition::new("c", "zzz + 1"),
        VariableDefinition::new("d", "2 +"),
        VariableDefinition::new("b", "1"),
    ];
    let issues = check_variables(&variables);
    assert_eq!(issues.len(), 4, "{issues:?}");
    assert_eq!(
        issues[0],
        VariableIssue::ForwardReference {
            variable: "a".to_string(),
            reference: "b".to_string(),
        }
    );
    assert_eq!(
        issues[1],
        VariableIssue::UnknownReference {
            variable: "c".to_string(),
            reference: "zzz".to_string(),
        }
    );
    assert!(matches!(&issues[2], VariableIssue::InvalidFormula { variable, .. } if variable == "d"));
    assert_eq!(
        issues[3],
        VariableIssue::DuplicateName {
            variable: "b".to_string()
        }
    );

    assert!(check_variables(&pool_variables()).is_empty());
}

// ---------------------------------------------------------------------------
// Line pricing
// ---------------------------------------------------------------------------

#[test]
fn prices_literal_line() {
    let pricing = price_line(&literal_line(10.0, 20.0, 30.0), &empty(), &PriceList::default());
    assert_close(pricing.effective_quantity, 10.0, "quantity");
    assert_close(pricing.effective_unit_cost, 20.0, "unit cost");
    assert_close(pricing.total_cost_ht, 200.0, "cost");
    assert_close(pricing.sale_price_ht, 260.0, "sale");
    assert_close(pricing.profit_ht, 60.0, "profit");
    assert_eq!(pricing.quantity_source, QuantitySource::Literal);
    assert_eq!(pricing.cost_source, CostSource::Literal);
}

#[test]
fn unit_cost_formula_takes_precedence_over_catalog() {
    let item = PriceListItem::new("Béton", "m3", 100.0);
    let price_list = PriceList::new(vec![item.clone()]);
    let ctx = resolve_context(&pool_dimensions(), &pool_variables());

    let mut line = literal_line(1.0, 5.0, 0.0);
    line.quantity_formula = Some("surface_m2 * 0.2".to_string());
    line.price_list_id = Some(item.id);
    line.unit_cost_formula = Some("longueur * 10".to_string());

    let pricing = price_line(&line, &ctx, &price_list);
    assert_close(pricing.effective_quantity, 6.4, "quantity");
    assert_close(pricing.effective_unit_cost, 80.0, "unit cost");
    assert_eq!(pricing.quantity_source, QuantitySource::Formula);
    assert_eq!(pricing.cost_source, CostSource::Formula);
}

#[test]
fn catalog_reference_is_live() {
    let mut item = PriceListItem::new("Liner", "m2", 40.0);
    let mut line = literal_line(10.0, 1.0, 0.0);
    line.price_list_id = Some(item.id);

    let before = price_line(&line, &empty(), &PriceList::new(vec![item.clone()]));
    assert_close(before.total_cost_ht, 400.0, "cost before price change");
    assert_eq!(before.cost_source, CostSource::Catalog(item.id));

    item.unit_price = 45.0;
    let after = price_line(&line, &empty(), &PriceList::new(vec![item.clone()]));
    assert_close(after.total_cost_ht, 450.0, "cost after price change");
}

#[test]
fn dangling_catalog_reference_falls_back_to_literal_cost() {
    let mut line = literal_line(2.0, 7.0, 0.0);
    let missing = PriceListItemId::new();
    line.price_list_id = Some(missing);

    let pricing = price_line(&line, &empty(), &PriceList::default());
    assert_close(pricing.effective_unit_cost, 7.0, "unit cost");
    assert_eq!(pricing.cost_source, CostSource::DanglingCatalog(missing));
}

#[test]
fn blank_formulas_count_as_unset() {
    let mut line = literal_line(3.0, 4.0, 0.0);
    line.quantity_formula = Some("   ".to_string());
    line.unit_cost_formula = Some(String::new());

    let pricing = price_line(&line, &empty(), &PriceList::default());
    assert_close(pricing.total_cost_ht, 12.0, "cost");
    assert_eq!(pricing.quantity_source, QuantitySource::Literal);
    assert_eq!(pricing.cost_source, CostSource::Literal);
}

#[test]
fn catalog_lookup_surfaces_unresolved_references() {
    let item = PriceListItem::new("Camion 8 m3", "rotation", 180.0);
    let price_list: PriceList = vec![item.clone()].into_iter().collect();
    assert_eq!(price_list.items(), &[item.clone()][..]);
    assert_eq!(price_list.len(), 1);

    let by_name = price_list.resolve(&CatalogRef::Name("Camion 8 m3".to_string()));
    assert_eq!(by_name.item().map(|i| i.id), Some(item.id));
    assert!(matches!(
        price_list.resolve(&CatalogRef::Id(item.id)),
        CatalogMatch::Resolved(_)
    ));
    assert_eq!(
        price_list.resolve(&CatalogRef::Name("camion 8 m3".to_string())),
        CatalogMatch::Unresolved(CatalogRef::Name("camion 8 m3".to_string())),
        "names match exactly"
    );
}

// ---------------------------------------------------------------------------
// Category rollup
// ---------------------------------------------------------------------------

#[test]
fn rolls_up_own_lines() {
    let lines = [
        literal_line(1.0, 100.0, 30.0),
        literal_line(1.0, 50.0, 30.0),
    ];
    let pricings: Vec<LinePricing> = lines
        .iter()
        .map(|l| price_line(l, &empty(), &PriceList::default()))
        .collect();
    let totals = rollup(&pricings, &[]);
    assert_close(totals.cost_ht, 150.0, "cost");
    assert_close(totals.sale_ht, 195.0, "sale");
    assert_close(totals.profit_ht, 45.0, "profit");
}

#[test]
fn parent_without_own_lines_equals_its_subcategory() {
    let product = ProductId::new();
    let top = BoqCategory {
        id: CategoryId::new(),
        product_id: product,
        parent_id: None,
        name: "Gros œuvre".to_string(),
        kind: CategoryKind::Base,
        order: 0,
    };
    let sub = BoqCategory {
        id: CategoryId::new(),
        product_id: product,
        parent_id: Some(top.id),
        name: "Radier".to_string(),
        kind: CategoryKind::Base,
        order: 0,
    };
    let mut a = literal_line(1.0, 100.0, 30.0);
    a.category_id = sub.id;
    let mut b = literal_line(1.0, 50.0, 30.0);
    b.category_id = sub.id;

    let tree = CategoryTree::assemble(product, vec![top, sub], vec![a, b]).expect("valid tree");
    let summary = price_tree(&tree, &empty(), &PriceList::default(), 20.0);

    let top_summary = &summary.categories[0];
    let sub_summary = &top_summary.subcategories[0];
    assert_eq!(top_summary.own, Totals::ZERO);
    assert_close(sub_summary.combined.cost_ht, 150.0, "sub cost");
    assert_eq!(top_summary.combined, sub_summary.combined);
    assert_eq!(
        summary.portfolio.base, sub_summary.combined,
        "portfolio counts each line once"
    );
    assert_eq!(summary.portfolio.options, Totals::ZERO);
}

#[test]
fn vat_helper_is_explicit() {
    assert_close(to_inclusive(100.0, 20.0), 120.0, "20%");
    assert_close(to_inclusive(100.0, 5.5), 105.5, "5.5%");
    assert_close(to_inclusive(100.0, 0.0), 100.0, "0%");
    assert_close(Totals::new(80.0, 100.0).sale_ttc(10.0), 110.0, "sale ttc");
}

#[test]
fn totals_add_and_sum() {
    let parts = [Totals::new(1.0, 2.0), Totals::new(3.0, 5.0)];
    let total: Totals = parts.iter().sum();
    assert_eq!(total, Totals::new(4.0, 7.0));
    assert_eq!(total.profit_ht, 3.0);
    assert_eq!(parts[0] + parts[1], total);
}

#[test]
fn non_finite_line_values_do_not_break_rollup() {
    let mut line = literal_line(1.0, 1.0, 30.0);
    line.quantity_formula = Some("1/0".to_string());
    line.unit_cost_formula = Some("0".to_string());
    let pricing = price_line(&line, &empty(), &PriceList::default());
    assert!(pricing.total_cost_ht.is_nan());

    let totals = rollup(&[pricing], &[Totals::new(10.0, 13.0)]);
    assert!(totals.cost_ht.is_nan());
    assert!(totals.sale_ht.is_nan());
}

// ---------------------------------------------------------------------------
// Tree assembly
// ---------------------------------------------------------------------------

fn category(product: ProductId, parent: Option<CategoryId>, name: &str) -> BoqCategory {
    BoqCategory {
        id: CategoryId::new(),
        product_id: product,
        parent_id: parent,
        name: name.to_string(),
        kind: CategoryKind::Base,
        order: 0,
    }
}

#[test]
fn tree_rejects_third_level() {
    let product = ProductId::new();
    let top = category(product, None, "top");
    let sub = category(product, Some(top.id), "sub");
    let deep = category(product, Some(sub.id), "deep");
    let err = CategoryTree::assemble(product, vec![top, sub, deep], Vec::new())
        .expect_err("three levels should be rejected");
    assert!(matches!(err, TreeError::TooDeep { ref name, .. } if name == "deep"));
}

#[test]
fn tree_rejects_dangling_rows() {
    let product = ProductId::new();
    let orphan = category(product, Some(CategoryId::new()), "orphan");
    assert!(matches!(
        CategoryTree::assemble(product, vec![orphan], Vec::new()),
        Err(TreeError::MissingParent { .. })
    ));

    let line = literal_line(1.0, 1.0, 0.0);
    assert!(matches!(
        CategoryTree::assemble(product, Vec::new(), vec![line]),
        Err(TreeError::OrphanLine { .. })
    ));

    let foreign = category(ProductId::new(), None, "foreign");
    assert!(matches!(
        CategoryTree::assemble(product, vec![foreign], Vec::new()),
        Err(TreeError::ForeignCategory { .. })
    ));
}

#[test]
fn tree_sorts_siblings_and_lines_by_order() {
    let product = ProductId::new();
    let mut second = category(product, None, "second");
    second.order = 2;
    let mut first = category(product, None, "first");
    first.order = 1;

    let mut late = literal_line(1.0, 1.0, 0.0);
    late.category_id = first.id;
    late.order = 5;
    late.description = "late".to_string();
    let mut early = literal_line(1.0, 1.0, 0.0);
    early.category_id = first.id;
    early.order = 1;
    early.description = "early".to_string();

    let tree = CategoryTree::assemble(product, vec![second, first], vec![late, early])
        .expect("valid tree");
    assert_eq!(tree.top[0].category.name, "first");
    assert_eq!(tree.top[1].category.name, "second");
    assert_eq!(tree.top[0].lines[0].description, "early");
    assert_eq!(tree.category_count(), 2);
    assert_eq!(tree.line_count(), 2);
}

// ---------------------------------------------------------------------------
// End-to-end summary
// ---------------------------------------------------------------------------

struct PricedProduct {
    store: MemoryStore,
    product: ProductId,
    price_list: PriceList,
}

fn priced_product(engine: &BoqEngine) -> PricedProduct {
    let mut store = MemoryStore::new();
    let product = ProductId::new();
    let beton = PriceListItem::new("Béton", "m3", 100.0);
    let price_list = PriceList::new(vec![beton.clone()]);

    let gros_oeuvre = store
        .create_category(NewCategory::top(product, "Gros œuvre", CategoryKind::Base))
        .expect("create top");
    let radier = store
        .create_category(NewCategory::sub(&gros_oeuvre, "Radier"))
        .expect("create sub");
    let terrassement = store
        .create_category(NewCategory::sub(&gros_oeuvre, "Terrassement").order(1))
        .expect("create sub");
    let options = store
        .create_category(NewCategory::top(product, "Options", CategoryKind::Option).order(1))
        .expect("create top");

    store
        .create_line(
            engine
                .new_line(radier.id, "Béton de radier")
                .quantity_formula("surface_m2*0.2")
                .catalog(&beton),
        )
        .expect("create line");
    store
        .create_line(
            engine
                .new_line(radier.id, "Coffrage")
                .quantity(10.0)
                .unit_cost(20.0)
                .order(1),
        )
        .expect("create line");
    store
        .create_line(
            engine
                .new_line(terrassement.id, "Fouille")
                .quantity_formula("volume_m3")
                .unit_cost(10.0)
                .margin(50.0),
        )
        .expect("create line");
    store
        .create_line(
            engine
                .new_line(options.id, "Pompe à chaleur")
                .quantity(1.0)
                .unit_cost(1000.0)
                .margin(20.0),
        )
        .expect("create line");

    PricedProduct {
        store,
        product,
        price_list,
    }
}

#[test]
fn summarizes_product_into_base_and_options() {
    let engine = BoqEngine::default();
    let fixture = priced_product(&engine);

    let summary = engine
        .summarize_product(
            &fixture.store,
            fixture.product,
            &pool_dimensions(),
            &pool_variables(),
            &fixture.price_list,
        )
        .expect("summary");

    assert_eq!(summary.categories.len(), 2);
    let gros_oeuvre = &summary.categories[0];
    assert_eq!(gros_oeuvre.name, "Gros œuvre");
    assert_eq!(gros_oeuvre.own, Totals::ZERO);
    assert_eq!(gros_oeuvre.subcategories.len(), 2);
    assert_close(gros_oeuvre.subcategories[0].combined.cost_ht, 840.0, "radier cost");
    assert_close(gros_oeuvre.combined.cost_ht, 1320.0, "gros oeuvre cost");

    assert_close(summary.portfolio.base.cost_ht, 1320.0, "base cost");
    assert_close(summary.portfolio.base.sale_ht, 1812.0, "base sale");
    assert_close(summary.portfolio.base.profit_ht, 492.0, "base profit");
    assert_close(summary.portfolio.options.cost_ht, 1000.0, "options cost");
    assert_close(summary.portfolio.options.sale_ht, 1200.0, "options sale");
    assert_close(summary.base_ttc(), 2174.4, "base ttc");
    assert_close(summary.options_ttc(), 1440.0, "options ttc");
    assert_close(summary.total_ht().sale_ht, 3012.0, "total sale");

    let beton = &gros_oeuvre.subcategories[0].lines[0];
    assert_eq!(beton.description, "Béton de radier");
    assert_eq!(beton.unit, "m3");
    assert!(matches!(beton.pricing.cost_source, CostSource::Catalog(_)));
}

#[test]
fn engine_reuses_parsed_formulas() {
    let engine = BoqEngine::default();
    let fixture = priced_product(&engine);
    for _ in 0..2 {
        engine
            .summarize_product(
                &fixture.store,
                fixture.product,
                &pool_dimensions(),
                &pool_variables(),
                &fixture.price_list,
            )
            .expect("summary");
    }
    let stats = engine.cache_stats();
    assert_eq!(stats.misses, 4, "two variables and two line formulas");
    assert_eq!(stats.hits, 4);
}

#[test]
fn engine_rejects_invalid_config() {
    let config = EngineConfig::default().with_vat_rate(f64::NAN);
    assert!(matches!(
        BoqEngine::new(config),
        Err(ConfigError::NotFinite { .. })
    ));
}

#[test]
fn new_lines_use_configured_margin() {
    let engine = BoqEngine::new(EngineConfig::default().with_default_margin(25.0))
        .expect("valid config");
    let line = engine.new_line(CategoryId::new(), "Margelles");
    assert_eq!(line.margin_percent, 25.0);
    assert_eq!(
        NewLine::new(CategoryId::new(), "x", &EngineConfig::default()).margin_percent,
        DEFAULT_MARGIN_PERCENT
    );
}

// ---------------------------------------------------------------------------
// Template instantiation
// ---------------------------------------------------------------------------

fn pool_template() -> BoqTemplate {
    builtin_template(POOL_TEMPLATE_NAME)
        .expect("pool template is embedded")
        .expect("pool template parses")
}

#[test]
fn builtin_template_parses() {
    let template = pool_template();
    assert_eq!(template.name, POOL_TEMPLATE_NAME);
    assert_eq!(template.category_count(), 9);
    assert_eq!(template.line_count(), 9);
    assert_eq!(template.categories[3].kind, CategoryKind::Option);
    assert!(template.categories[3].kind.is_option());
    assert!(!template.categories[0].kind.is_option());
    assert_eq!(CategoryKind::from_is_option(true), CategoryKind::Option);
    assert_eq!(CategoryKind::from_is_option(false), CategoryKind::Base);
    assert!(builtin_template("chalet").is_none());
}

#[test]
fn instantiates_template_and_reports_unresolved_names() {
    let engine = BoqEngine::default();
    let mut store = MemoryStore::new();
    let product = ProductId::new();
    let beton = PriceListItem::new("Béton C25/30", "m3", 120.0);
    let price_list = PriceList::new(vec![beton.clone()]);

    assert!(!has_tree(&store, product).expect("list"));
    let report = engine
        .instantiate(&mut store, &pool_template(), product, &price_list)
        .expect("instantiate");
    assert!(has_tree(&store, product).expect("list"));

    assert_eq!(
        report.created,
        WriteCounts {
            categories: 9,
            lines: 9
        }
    );
    assert_eq!(
        report.unresolved,
        vec![
            "Terrassement pelle mécanique",
            "Camion 8 m3",
            "Treillis ST25C",
            "Bloc à bancher 20",
            "Liner 75/100",
            "Pompe à chaleur 12 kW",
            "Volet immergé",
        ]
    );

    let tree = engine.load_tree(&store, product).expect("tree");
    let gros_oeuvre = &tree.top[1];
    assert_eq!(gros_oeuvre.category.name, "Gros œuvre");
    assert_eq!(gros_oeuvre.category.order, 1);
    let radier = &gros_oeuvre.subcategories[0];
    assert_eq!(radier.category.parent_id, Some(gros_oeuvre.category.id));

    let beton_line = &radier.lines[0];
    assert_eq!(beton_line.price_list_id, Some(beton.id));
    assert_eq!(beton_line.unit, "m3");
    assert_eq!(beton_line.unit_cost, 120.0);
    assert_eq!(beton_line.margin_percent, DEFAULT_MARGIN_PERCENT);
    assert_eq!(beton_line.quantity_formula.as_deref(), Some("surface_m2 * 0.2"));
    assert_eq!(beton_line.order, 0);

    let treillis = &radier.lines[1];
    assert_eq!(treillis.price_list_id, None);
    assert_eq!(treillis.unit, "panneau");
    assert_eq!(treillis.unit_cost, 0.0);
    assert_eq!(treillis.order, 1);

    let options = &tree.top[3];
    assert_eq!(options.subcategories[0].category.kind, CategoryKind::Option);
}

#[test]
fn instantiating_twice_appends_a_second_tree() {
    let mut store = MemoryStore::new();
    let product = ProductId::new();
    let config = EngineConfig::default();
    let template = pool_template();
    for _ in 0..2 {
        instantiate(&mut store, &template, product, &PriceList::default(), &config)
            .expect("instantiate");
    }
    assert_eq!(store.list_categories(product).expect("list").len(), 18);
    assert_eq!(store.list_product_lines(product).expect("list").len(), 18);
}

#[test]
fn instantiation_stops_at_first_failed_write() {
    let mut store = MemoryStore::new();
    let product = ProductId::new();
    store.fail_after(4);

    let err = instantiate(
        &mut store,
        &pool_template(),
        product,
        &PriceList::default(),
        &EngineConfig::default(),
    )
    .expect_err("fifth write fails");
    assert_eq!(
        err.completed,
        WriteCounts {
            categories: 2,
            lines: 2
        }
    );
    assert!(matches!(err.source, StoreError::Backend(_)));
    assert_eq!(store.list_categories(product).expect("list").len(), 2);
    assert_eq!(store.list_product_lines(product).expect("list").len(), 2);
    assert_eq!(store.writes(), 4);

    // Retrying after the backend recovers appends a full tree next to the
    // partial one.
    store.heal();
    let report = instantiate(
        &mut store,
        &pool_template(),
        product,
        &PriceList::default(),
        &EngineConfig::default(),
    )
    .expect("retry succeeds");
    assert_eq!(
        report.created,
        WriteCounts {
            categories: 9,
            lines: 9
        }
    );
    assert_eq!(store.writes(), 22);
    assert_eq!(store.list_categories(product).expect("list").len(), 11);
}

// ---------------------------------------------------------------------------
// Tree cloning
// ---------------------------------------------------------------------------

/// Three top categories (one with two subcategories) and seven lines.
fn seed_clone_source(store: &mut MemoryStore, product: ProductId) {
    let config = EngineConfig::default();
    let a = store
        .create_category(NewCategory::top(product, "A", CategoryKind::Base))
        .expect("create");
    let a1 = store
        .create_category(NewCategory::sub(&a, "A1"))
        .expect("create");
    let a2 = store
        .create_category(NewCategory::sub(&a, "A2").order(1))
        .expect("create");
    let b = store
        .create_category(NewCategory::top(product, "B", CategoryKind::Base).order(1))
        .expect("create");
    let c = store
        .create_category(NewCategory::top(product, "C", CategoryKind::Option).order(2))
        .expect("create");

    let item = PriceListItem::new("Liner", "m2", 40.0);
    let lines = [
        NewLine::new(a1.id, "a1-1", &config).quantity_formula("surface_m2"),
        NewLine::new(a1.id, "a1-2", &config).unit_cost_formula("CEIL(longueur)").order(1),
        NewLine::new(a2.id, "a2-1", &config).catalog(&item),
        NewLine::new(a2.id, "a2-2", &config).quantity(3.0).margin(12.5).order(1),
        NewLine::new(b.id, "b-1", &config).quantity(1.0).unit_cost(10.0),
        NewLine::new(b.id, "b-2", &config).quantity(2.0).unit_cost(5.0).order(1),
        NewLine::new(c.id, "c-1", &config).quantity(1.0).unit_cost(900.0),
    ];
    for line in lines {
        store.create_line(line).expect("create line");
    }
}

type LineShape = (String, Option<String>, Option<String>, Option<PriceListItemId>, String, i32);

fn line_shapes(lines: &[BoqLine]) -> Vec<LineShape> {
    lines
        .iter()
        .map(|l| {
            (
                l.description.clone(),
                l.quantity_formula.clone(),
                l.unit_cost_formula.clone(),
                l.price_list_id,
                format!("{}|{}|{}|{}", l.quantity, l.unit, l.unit_cost, l.margin_percent),
                l.order,
            )
        })
        .collect()
}

type TreeShape = Vec<(String, CategoryKind, i32, Vec<LineShape>, Vec<(String, i32, Vec<LineShape>)>)>;

fn tree_shape(tree: &CategoryTree) -> TreeShape {
    tree.top
        .iter()
        .map(|top| {
            (
                top.category.name.clone(),
                top.category.kind,
                top.category.order,
                line_shapes(&top.lines),
                top.subcategories
                    .iter()
                    .map(|sub| {
                        (
                            sub.category.name.clone(),
                            sub.category.order,
                            line_shapes(&sub.lines),
                        )
                    })
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn clone_copies_an_isomorphic_tree() {
    let engine = BoqEngine::default();
    let mut store = MemoryStore::new();
    let source = ProductId::new();
    let dest = ProductId::new();
    seed_clone_source(&mut store, source);

    let counts = engine
        .clone_tree(&mut store, source, dest)
        .expect("clone");
    assert_eq!(
        counts,
        WriteCounts {
            categories: 5,
            lines: 7
        }
    );

    let source_tree = engine.load_tree(&store, source).expect("source tree");
    let dest_tree = engine.load_tree(&store, dest).expect("dest tree");
    assert_eq!(tree_shape(&dest_tree), tree_shape(&source_tree));

    let source_ids: Vec<CategoryId> = source_tree.top.iter().map(|t| t.category.id).collect();
    assert!(
        dest_tree
            .top
            .iter()
            .all(|t| !source_ids.contains(&t.category.id)),
        "destination categories get fresh ids"
    );
    assert_eq!(store.list_categories(source).expect("list").len(), 5);
}

#[test]
fn clone_reports_partial_progress() {
    let mut store = MemoryStore::new();
    let source = ProductId::new();
    let dest = ProductId::new();
    seed_clone_source(&mut store, source);
    store.fail_after(3);

    let err = clone_tree(&mut store, source, dest).expect_err("fourth write fails");
    assert_eq!(
        err.completed,
        WriteCounts {
            categories: 3,
            lines: 0
        }
    );
    assert_eq!(store.list_categories(dest).expect("list").len(), 3);
    assert!(err.to_string().contains("3 categories, 0 lines"));
}

#[test]
fn clear_product_removes_the_whole_tree() {
    let mut store = MemoryStore::new();
    let product = ProductId::new();
    seed_clone_source(&mut store, product);

    let lines = store.list_product_lines(product).expect("list");
    let categories = store.list_categories(product).expect("list");
    assert!(store.line(lines[0].id).is_some());
    assert!(store.category(categories[0].id).is_some());

    let counts = clear_product(&mut store, product).expect("clear");
    assert_eq!(
        counts,
        WriteCounts {
            categories: 5,
            lines: 7
        }
    );
    assert!(!has_tree(&store, product).expect("list"));
    assert!(store.line(lines[0].id).is_none());
    assert!(store.category(categories[0].id).is_none());
}

#[test]
fn memory_store_refuses_to_orphan_rows() {
    let mut store = MemoryStore::new();
    let product = ProductId::new();
    let top = store
        .create_category(NewCategory::top(product, "top", CategoryKind::Base))
        .expect("create");
    let sub = store
        .create_category(NewCategory::sub(&top, "sub"))
        .expect("create");
    store
        .create_line(NewLine::new(sub.id, "line", &EngineConfig::default()))
        .expect("create");

    assert!(matches!(
        store.delete_category(top.id),
        Err(StoreError::Rejected(_))
    ));
    assert!(matches!(
        store.delete_category(sub.id),
        Err(StoreError::Rejected(_))
    ));
    assert!(matches!(
        store.create_line(NewLine::new(CategoryId::new(), "x", &EngineConfig::default())),
        Err(StoreError::NotFound { .. })
    ));
}

// ---------------------------------------------------------------------------
// Configuration and serialization
// ---------------------------------------------------------------------------

#[test]
fn config_parses_json_with_defaults() {
    let config = EngineConfig::from_json(r#"{"defaultMarginPercent": 25}"#).expect("config");
    assert_eq!(config.default_margin_percent, 25.0);
    assert_eq!(config.vat_rate_percent, DEFAULT_VAT_RATE_PERCENT);
    assert_eq!(config.formula_cache_capacity.get(), 256);

    assert!(matches!(
        EngineConfig::from_json(r#"{"vatRatePercent": -5}"#),
        Err(ConfigError::Negative { .. })
    ));
    assert!(matches!(
        EngineConfig::from_json(r#"{"formulaCacheCapacity": 0}"#),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        EngineConfig::from_json("not json"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn rows_use_camel_case_json() {
    let json = serde_json::json!({
        "id": "6f1c2b9e-4a0c-4f1e-9d7a-2b3c4d5e6f70",
        "categoryId": "0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d",
        "description": "Liner",
        "quantity": 0.0,
        "quantityFormula": "surface_m2",
        "unit": "m2",
        "unitCost": 40.0,
        "marginPercent": 30.0,
        "order": 2
    });
    let line: BoqLine = serde_json::from_value(json).expect("line");
    assert_eq!(line.quantity_formula.as_deref(), Some("surface_m2"));
    assert_eq!(line.unit_cost_formula, None);
    assert_eq!(line.price_list_id, None);

    let kind = serde_json::to_value(CategoryKind::Option).expect("kind");
    assert_eq!(kind, serde_json::json!("option"));
}
