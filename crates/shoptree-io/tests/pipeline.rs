//! End-to-end: simulate sessions, write CSV, read back, train, report, persist.

use std::fs;

use shoptree_cart::DecisionTreeClassifier;
use shoptree_io::{Dataset, ModelStore, ReportWriter, SessionPool, SessionReader, SummaryRow, write_sessions};
use shoptree_sim::SessionGenerator;
use tempfile::TempDir;

#[test]
fn csv_to_trained_report() {
    let dir = TempDir::new().unwrap();
    let train_path = dir.path().join("Data_Input").join("shoppers_train.csv");
    let test_path = dir.path().join("Data_Input").join("shoppers_actual.csv");

    write_sessions(&train_path, &SessionGenerator::new(42).generate(600).unwrap()).unwrap();
    write_sessions(&test_path, &SessionGenerator::new(43).generate(200).unwrap()).unwrap();

    let train = SessionReader::new(&train_path).read().unwrap();
    let test = SessionReader::new(&test_path).read().unwrap();
    assert_eq!(train.len(), 600);
    assert_eq!(test.len(), 200);

    let mut tree = DecisionTreeClassifier::new(4, train.feature_names()).unwrap();
    tree.fit(&train.features(), &train.labels()).unwrap();
    assert!(tree.depth() <= 4);

    let eval = tree.evaluate(&test.features(), &test.labels()).unwrap();
    assert_eq!(eval.confusion.total(), 200);
    // Label noise caps accuracy, but the returning-visitor signal alone beats chance.
    assert!(eval.accuracy > 0.6, "accuracy {} too low", eval.accuracy);

    let reports = ReportWriter::new(&dir.path().join("out")).unwrap();
    reports.write_tree(4, 1, &tree).unwrap();
    reports.write_metrics(4, 1, &eval).unwrap();
    reports.write_summary(&[SummaryRow::new(4, 1, &eval)]).unwrap();

    let dump = fs::read_to_string(dir.path().join("out/depth_4/Tree_R1.txt")).unwrap();
    assert!(dump.starts_with("root: [X"));
    assert!(dump.contains("Predict: "));
    assert!(dir.path().join("out/depth_summary.json").exists());

    let model_path = dir.path().join("out/model.bin");
    ModelStore::save(&tree, &model_path).unwrap();
    let loaded = ModelStore::load(&model_path).unwrap();
    assert_eq!(loaded.render(), tree.render());
    assert_eq!(
        loaded.evaluate(&test.features(), &test.labels()).unwrap(),
        eval
    );
}

#[test]
fn cumulative_pool_grows_across_rounds() {
    let dir = TempDir::new().unwrap();
    let reports = ReportWriter::new(dir.path()).unwrap();
    reports.depth_dir(3).unwrap();
    let mut pool = SessionPool::create(&reports.pool_path(3)).unwrap();
    let mut tree = DecisionTreeClassifier::new(3, shoptree_sim::feature_names()).unwrap();

    let batches: Vec<Dataset> = (0..3)
        .map(|i| Dataset::from(SessionGenerator::new(100 + i).generate(150).unwrap()))
        .collect();

    for (round, batch) in batches.iter().enumerate() {
        let eval = tree.evaluate(&batch.features(), &batch.labels()).unwrap();
        assert_eq!(eval.is_skipped(), round == 0);

        pool.append(batch).unwrap();
        let data = pool.dataset();
        tree.fit(&data.features(), &data.labels()).unwrap();
        assert_eq!(data.len(), 150 * (round + 1));
    }

    let on_disk = SessionReader::new(&reports.pool_path(3)).read().unwrap();
    assert_eq!(on_disk.len(), 450);
}
