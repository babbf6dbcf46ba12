use brew_workflow::{
    Change, CompletionStatus, EndKind, Engine, EngineConfig, Error, Ingredient, IngredientProperties,
    Metric, Position, Quantity, Range, Recipe, RunOutcome, StepOutcome, StrategyCatalog, StrategyId,
    StyleTarget, Usage, WorkflowGraph,
};

fn american_pale_ale() -> StyleTarget {
    StyleTarget {
        style: "american-pale-ale".into(),
        original_gravity: Range::new(1.045, 1.060),
        final_gravity: Range::new(1.010, 1.015),
        abv: Range::new(4.5, 6.2),
        ibu: Range::new(30.0, 50.0),
        srm: Range::new(5.0, 10.0),
    }
}

fn pale_ale(pale_kg: f64, attenuation: f64) -> Recipe {
    Recipe::new("House Pale", 20.0, 75.0, 60.0)
        .with_ingredient(Ingredient::new(
            "pale",
            "Pale Ale Malt",
            Quantity::kilograms(pale_kg),
            Usage::Mash,
            IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
        ))
        .with_ingredient(Ingredient::new(
            "crystal",
            "Crystal 60",
            Quantity::kilograms(0.3),
            Usage::Mash,
            IngredientProperties::SpecialtyFermentable { potential: 1.034, color: 60.0 },
        ))
        .with_ingredient(Ingredient::new(
            "cascade",
            "Cascade",
            Quantity::grams(28.0),
            Usage::Boil { minutes: 60.0 },
            IngredientProperties::BitteringAgent { alpha_acid: 10.0 },
        ))
        .with_ingredient(Ingredient::new(
            "us05",
            "US-05",
            Quantity::packages(1.0),
            Usage::Fermentation,
            IngredientProperties::BiologicalAgent { attenuation },
        ))
}

fn without(mut recipe: Recipe, id: &str) -> Recipe {
    recipe.ingredients.retain(|i| i.id.as_str() != id);
    recipe
}

fn heavy_stout_attempt() -> Recipe {
    Recipe::new("Overbuilt", 20.0, 75.0, 60.0)
        .with_ingredient(Ingredient::new(
            "pale",
            "Pale Ale Malt",
            Quantity::kilograms(7.0),
            Usage::Mash,
            IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
        ))
        .with_ingredient(Ingredient::new(
            "chocolate",
            "Chocolate Malt",
            Quantity::kilograms(0.4),
            Usage::Mash,
            IngredientProperties::SpecialtyFermentable { potential: 1.028, color: 350.0 },
        ))
        .with_ingredient(Ingredient::new(
            "magnum",
            "Magnum",
            Quantity::grams(90.0),
            Usage::Boil { minutes: 60.0 },
            IngredientProperties::BitteringAgent { alpha_acid: 13.0 },
        ))
        .with_ingredient(Ingredient::new(
            "dextrose",
            "Dextrose",
            Quantity::grams(500.0),
            Usage::Boil { minutes: 10.0 },
            IngredientProperties::Other { potential: Some(1.046), color: 0.0 },
        ))
}

/// A small pale batch whose only dark grain is far too strong for one step.
fn pale_with_black_patent() -> Recipe {
    Recipe::new("Tiny Pale", 10.0, 75.0, 60.0)
        .with_ingredient(Ingredient::new(
            "pale",
            "Pale Ale Malt",
            Quantity::kilograms(2.0),
            Usage::Mash,
            IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
        ))
        .with_ingredient(Ingredient::new(
            "black_patent",
            "Black Patent",
            Quantity::kilograms(0.0),
            Usage::Mash,
            IngredientProperties::SpecialtyFermentable { potential: 1.025, color: 500.0 },
        ))
        .with_ingredient(Ingredient::new(
            "crystal_20",
            "Crystal 20",
            Quantity::kilograms(0.0),
            Usage::Mash,
            IngredientProperties::SpecialtyFermentable { potential: 1.035, color: 20.0 },
        ))
}

/// A 5 L batch with one high-alpha hop and nothing in the kettle yet.
fn small_batch_high_alpha() -> Recipe {
    Recipe::new("Tiny Bitter", 5.0, 75.0, 60.0)
        .with_ingredient(Ingredient::new(
            "pale",
            "Pale Ale Malt",
            Quantity::kilograms(1.0),
            Usage::Mash,
            IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
        ))
        .with_ingredient(Ingredient::new(
            "crystal",
            "Crystal 60",
            Quantity::kilograms(0.05),
            Usage::Mash,
            IngredientProperties::SpecialtyFermentable { potential: 1.034, color: 60.0 },
        ))
        .with_ingredient(Ingredient::new(
            "warrior",
            "Warrior",
            Quantity::grams(0.0),
            Usage::Boil { minutes: 60.0 },
            IngredientProperties::BitteringAgent { alpha_acid: 16.0 },
        ))
}

fn run(recipe: &Recipe) -> RunOutcome {
    Engine::standard()
        .run(recipe, &american_pale_ale())
        .expect("run should complete")
}

#[test]
fn scenario_a_in_range_recipe_needs_no_changes() {
    let recipe = pale_ale(4.0, 75.0);
    let outcome = run(&recipe);

    assert_eq!(outcome.status, CompletionStatus::NoChangesNeeded);
    assert!(outcome.trace.is_empty());
    assert_eq!(outcome.recipe.ingredients, recipe.ingredients);
    assert_eq!(outcome.initial_metrics, outcome.final_metrics);
    assert!(outcome.validation.iter().all(|e| e.in_range));
}

#[test]
fn scenario_b_low_gravity_gets_one_base_malt_increment() {
    let recipe = pale_ale(3.5, 75.0);
    let outcome = run(&recipe);
    let target = american_pale_ale();

    assert_eq!(outcome.status, CompletionStatus::FullyInRange);
    assert_eq!(outcome.trace.len(), 1);

    let step = &outcome.trace[0];
    assert_eq!(step.strategy, StrategyId::AdjustBaseFermentables);
    assert_eq!(step.metric, Metric::OriginalGravity);
    let StepOutcome::Applied { target_value, .. } = &step.outcome else {
        panic!("expected an applied change");
    };
    let og = outcome.final_metrics.original_gravity;
    assert!(og > outcome.initial_metrics.original_gravity);
    assert!(og >= target.original_gravity.min);
    assert!(og <= *target_value, "moved past the conservative target");

    let pale = outcome.recipe.ingredient(&"pale".into()).unwrap();
    assert!((pale.quantity.amount - 3.75).abs() < 1e-9);
    // The caller's copy is untouched.
    assert_eq!(recipe.ingredients[0].quantity.amount, 3.5);
}

#[test]
fn scenario_c_no_bittering_agent_needs_manual_review() {
    let outcome = run(&without(pale_ale(4.0, 75.0), "cascade"));

    assert_eq!(outcome.status, CompletionStatus::Uncorrectable);
    assert_eq!(outcome.end, EndKind::ManualReview);
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.trace[0].strategy, StrategyId::AdjustBitteringAgents);
    assert!(matches!(
        outcome.trace[0].outcome,
        StepOutcome::NoApplicableChange { .. }
    ));
}

#[test]
fn scenario_d_negative_batch_volume_fails_before_any_node() {
    let mut recipe = pale_ale(4.0, 75.0);
    recipe.batch_volume_l = -20.0;
    let failure = Engine::standard()
        .run(&recipe, &american_pale_ale())
        .unwrap_err();

    assert!(matches!(failure.error, Error::InvalidBatchParameters(_)));
    assert!(failure.path.is_empty());
    assert!(failure.trace.is_empty());
    assert_eq!(failure.stats.nodes_visited, 0);
}

#[test]
fn scenario_e_backward_cycle_is_detected() {
    let graph = WorkflowGraph::from_json(
        r#"[
            { "id": "start", "phase": 0, "kind": "start", "next": "og_adjust" },
            { "id": "og_adjust", "phase": 1, "kind": "action",
              "strategy": "adjust_base_fermentables", "metric": "original_gravity", "next": "check" },
            { "id": "check", "phase": 2, "kind": "decision",
              "condition": "all_in_range", "when_true": "done", "when_false": "og_adjust" },
            { "id": "done", "phase": 3, "kind": "end", "outcome": "completed" }
        ]"#,
    )
    .unwrap();
    let engine = Engine::new(graph, StrategyCatalog::standard(), EngineConfig::default()).unwrap();

    // No hops: bitterness can never come into range, so the check fails.
    let recipe = without(pale_ale(3.5, 75.0), "cascade");
    let failure = engine.run(&recipe, &american_pale_ale()).unwrap_err();

    assert!(matches!(
        failure.error,
        Error::PhaseRegression { from_phase: 2, to_phase: 1, .. }
    ));
    // The base malt change made before the failure is still reported.
    assert_eq!(failure.trace.len(), 1);
    assert!(failure.trace[0].outcome.is_applied());
}

#[test]
fn scenario_e_same_phase_cycle_exhausts_the_budget() {
    let graph = WorkflowGraph::from_json(
        r#"[
            { "id": "start", "phase": 0, "kind": "start", "next": "ping" },
            { "id": "ping", "phase": 1, "kind": "decision",
              "condition": { "in_range": "ibu" }, "when_true": "done", "when_false": "pong" },
            { "id": "pong", "phase": 1, "kind": "multi_decision",
              "gate": { "gate": "first_out_of_range",
                        "routes": [{ "metric": "ibu", "to": "ping" }], "otherwise": "done" } },
            { "id": "done", "phase": 2, "kind": "end", "outcome": "completed" }
        ]"#,
    )
    .unwrap();
    let engine = Engine::new(graph, StrategyCatalog::standard(), EngineConfig::default()).unwrap();
    let budget = engine.max_steps();
    assert_eq!(budget, 4 * 4 + 16);

    let recipe = without(pale_ale(4.0, 75.0), "cascade");
    let failure = engine.run(&recipe, &american_pale_ale()).unwrap_err();

    assert!(matches!(failure.error, Error::WorkflowBudgetExceeded { limit } if limit == budget));
    assert_eq!(failure.path.len(), budget);
}

#[test]
fn cross_effects_downgrade_to_partially_corrected() {
    // Low attenuation leaves FG high; fixing it knocks gravity and alcohol around.
    let outcome = run(&pale_ale(4.0, 60.0));

    assert_eq!(outcome.status, CompletionStatus::PartiallyCorrected);
    assert!(outcome.changed());
    assert!(outcome.trace.iter().any(|s| s.strategy == StrategyId::ScaleFermentables));
    assert!(!outcome.validation.iter().all(|e| e.in_range));
}

#[test]
fn runs_are_deterministic() {
    for recipe in [pale_ale(3.5, 75.0), pale_ale(4.0, 60.0), heavy_stout_attempt()] {
        let first = serde_json::to_string(&run(&recipe)).unwrap();
        let second = serde_json::to_string(&run(&recipe)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn quantities_never_go_negative() {
    for recipe in [pale_ale(3.5, 75.0), pale_ale(4.0, 60.0), heavy_stout_attempt()] {
        let outcome = run(&recipe);
        for ingredient in &outcome.recipe.ingredients {
            assert!(ingredient.quantity.amount >= 0.0, "{} went negative", ingredient.id);
        }
    }
}

#[test]
fn phases_never_decrease_and_runs_stay_in_budget() {
    let engine = Engine::standard();
    for recipe in [pale_ale(3.5, 75.0), pale_ale(4.0, 60.0), heavy_stout_attempt()] {
        let outcome = engine.run(&recipe, &american_pale_ale()).unwrap();
        assert!(outcome.path.windows(2).all(|w| w[0].phase <= w[1].phase));
        assert!(outcome.trace.windows(2).all(|w| w[0].phase <= w[1].phase));
        assert!(outcome.path.len() <= engine.max_steps());
        assert_eq!(outcome.stats.nodes_visited, outcome.path.len());
    }
}

#[test]
fn targets_stay_strictly_between_boundary_and_midpoint() {
    let target = american_pale_ale();
    for recipe in [pale_ale(3.5, 75.0), pale_ale(4.0, 60.0), heavy_stout_attempt()] {
        for step in run(&recipe).trace {
            let StepOutcome::Applied { target_value, .. } = step.outcome else {
                continue;
            };
            let range = target.range(step.metric);
            let mid = range.midpoint();
            let low_side = target_value > range.min && target_value < mid;
            let high_side = target_value > mid && target_value < range.max;
            assert!(low_side || high_side, "{} target {target_value} out of bounds", step.metric);
        }
    }
}

#[test]
fn heavy_recipe_is_pulled_down() {
    let outcome = run(&heavy_stout_attempt());
    assert!(outcome.changed());
    assert!(outcome.final_metrics.original_gravity < outcome.initial_metrics.original_gravity);
    assert!(outcome.final_metrics.srm < outcome.initial_metrics.srm);
}

#[test]
fn applied_steps_never_carry_a_metric_across_its_range() {
    let target = american_pale_ale();
    let recipes = [
        pale_ale(3.5, 75.0),
        pale_ale(4.0, 60.0),
        heavy_stout_attempt(),
        pale_with_black_patent(),
        small_batch_high_alpha(),
    ];
    for recipe in recipes {
        let outcome = run(&recipe);
        let mut before = outcome.initial_metrics;
        for step in &outcome.trace {
            if !step.outcome.is_applied() {
                continue;
            }
            let range = target.range(step.metric);
            let from = range.position(before.get(step.metric));
            let to = range.position(step.metrics.get(step.metric));
            assert!(
                !matches!(
                    (from, to),
                    (Position::Below, Position::Above) | (Position::Above, Position::Below)
                ),
                "{}: {} jumped from {from:?} to {to:?}",
                recipe.name,
                step.metric
            );
            before = step.metrics;
        }
    }
}

#[test]
fn dark_grain_too_strong_for_one_step_gives_way_to_crystal() {
    let outcome = run(&pale_with_black_patent());
    let srm = american_pale_ale().srm;
    assert!(outcome.initial_metrics.srm < srm.min);

    let step = &outcome.trace[0];
    assert_eq!(step.strategy, StrategyId::AdjustSpecialtyFermentables);
    let StepOutcome::Applied { deltas, target_value, .. } = &step.outcome else {
        panic!("expected an applied change, got {:?}", step.outcome);
    };
    assert!(deltas.iter().all(|d| d.ingredient.as_str() == "crystal_20"));
    assert!(srm.contains(outcome.final_metrics.srm));
    assert!(outcome.final_metrics.srm <= *target_value);

    let black = outcome.recipe.ingredient(&"black_patent".into()).unwrap();
    assert_eq!(black.quantity.amount, 0.0);
}

#[test]
fn empty_flameout_hop_does_not_block_bitterness() {
    let recipe = without(pale_ale(4.0, 75.0), "cascade")
        .with_ingredient(Ingredient::new(
            "flameout",
            "Citra",
            Quantity::grams(0.0),
            Usage::Boil { minutes: 0.0 },
            IngredientProperties::BitteringAgent { alpha_acid: 12.0 },
        ))
        .with_ingredient(Ingredient::new(
            "bitter",
            "Magnum",
            Quantity::grams(0.0),
            Usage::Boil { minutes: 60.0 },
            IngredientProperties::BitteringAgent { alpha_acid: 10.0 },
        ));
    let outcome = run(&recipe);

    assert_eq!(outcome.status, CompletionStatus::FullyInRange);
    assert_eq!(outcome.end, EndKind::Completed);
    assert_eq!(outcome.trace.len(), 1);
    let StepOutcome::Applied { deltas, .. } = &outcome.trace[0].outcome else {
        panic!("expected an applied change");
    };
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].ingredient.as_str(), "bitter");
    assert!(matches!(deltas[0].change, Change::Adjust { amount } if amount > 0.0));
}
