use handsign::annotate::BoundingBox;
use handsign::classifier::{check_input, Classifier, ModelName, ModelRegistry};
use handsign::config::Config;
use handsign::image::{ChannelOrder, Color, Frame, Resolution};
use handsign::labels::LabelTable;
use handsign::landmark::{HandLandmarks, LandmarkExtractor};
use handsign::pipeline::{ModelSelection, Pipeline};
use handsign::{image::Image, Error, Result};

/// Reports the same hands for every image.
struct Scripted(Vec<HandLandmarks>);

impl LandmarkExtractor for Scripted {
    fn detect(&self, _: &Image) -> Result<Vec<HandLandmarks>> {
        Ok(self.0.clone())
    }
}

struct Failing;

impl LandmarkExtractor for Failing {
    fn detect(&self, _: &Image) -> Result<Vec<HandLandmarks>> {
        Err(Error::Inference(anyhow::anyhow!("network exploded")))
    }
}

/// Predicts `class` for any input of the right length.
struct Constant {
    dim: usize,
    class: u32,
    list_classes: bool,
}

impl Constant {
    fn boxed(class: u32) -> Box<dyn Classifier> {
        Box::new(Constant {
            dim: 84,
            class,
            list_classes: true,
        })
    }
}

impl Classifier for Constant {
    fn input_dim(&self) -> usize {
        self.dim
    }

    fn predict(&self, features: &[f32]) -> Result<u32> {
        check_input(self.dim, features)?;
        Ok(self.class)
    }

    fn classes(&self) -> Option<Vec<u32>> {
        self.list_classes.then(|| vec![self.class])
    }
}

fn hand() -> HandLandmarks {
    let mut points = [[0.5, 0.5]; 21];
    points[4] = [0.25, 0.25];
    points[20] = [0.75, 0.875];
    HandLandmarks::new(points)
}

fn labels() -> LabelTable {
    LabelTable::parse("0 A\n1 B\n").unwrap()
}

fn registry(models: &[(ModelName, u32)]) -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    for &(name, class) in models {
        registry.insert(name, Constant::boxed(class));
    }
    registry
}

fn blank_frame(order: ChannelOrder) -> Frame {
    let res = Resolution::new(320, 240);
    // a dark gray background, so untouched pixels are distinguishable from drawn black
    Frame::new(res, order, vec![30; res.num_pixels() * 3]).unwrap()
}

fn pipeline<E>(extractor: E, models: &[(ModelName, u32)]) -> Pipeline
where
    E: LandmarkExtractor + 'static,
{
    Pipeline::new(labels(), registry(models), extractor, Config::default()).unwrap()
}

#[test]
fn classifies_and_annotates() {
    handsign::init_logger!();

    let pipeline = pipeline(Scripted(vec![hand()]), &[(ModelName::Svm, 1)]);
    let input = blank_frame(ChannelOrder::Rgb);
    let outcome = pipeline.process_detailed(input.clone(), ModelName::Svm);

    let prediction = outcome.prediction.expect("a hand was detected");
    assert_eq!(prediction.label, "B");
    assert_eq!(prediction.class, 1);
    assert_eq!(prediction.model, ModelName::Svm);

    // 0.25 * 320 - 10, 0.25 * 240 - 10, 0.75 * 320 - 10, 0.875 * 240 - 10
    let bbox = outcome.bbox.unwrap();
    assert_eq!(
        bbox,
        BoundingBox {
            x1: 70,
            y1: 50,
            x2: 230,
            y2: 200,
        }
    );

    let frame = outcome.frame;
    assert_ne!(frame, input);
    assert_eq!(frame.get(70, 120), Color::BLUE);
    assert_eq!(frame.get(230, 120), Color::BLUE);
    assert_eq!(frame.get(150, 50), Color::BLUE);
    assert_eq!(frame.get(150, 120), Color::from_rgb8(30, 30, 30));
    assert!((0..40).any(|y| (70..150).any(|x| frame.get(x, y) == Color::WHITE)));
}

#[test]
fn frame_without_hands_is_unchanged() {
    let pipeline = pipeline(Scripted(Vec::new()), &[(ModelName::Knn, 0)]);
    let input = blank_frame(ChannelOrder::Bgr);

    let outcome = pipeline.process_detailed(input.clone(), ModelName::Knn);
    assert!(outcome.prediction.is_none());
    assert!(outcome.bbox.is_none());
    assert_eq!(outcome.frame.data(), input.data());
}

#[test]
fn errors_pass_frame_through() {
    let input = blank_frame(ChannelOrder::Rgb);

    let failing = pipeline(Failing, &[(ModelName::Knn, 0)]);
    assert_eq!(failing.process(input.clone(), ModelName::Knn), input);

    // selected model is not loaded
    let missing = pipeline(Scripted(vec![hand()]), &[(ModelName::Knn, 0)]);
    assert_eq!(missing.process(input.clone(), ModelName::Svm), input);

    // more hands than the feature vector has room for
    let three = pipeline(
        Scripted(vec![hand(), hand(), hand()]),
        &[(ModelName::Knn, 0)],
    );
    assert_eq!(three.process(input.clone(), ModelName::Knn), input);

    // class without label, from a model that doesn't list its classes
    let mut registry = ModelRegistry::new();
    registry.insert(
        ModelName::Knn,
        Box::new(Constant {
            dim: 84,
            class: 9,
            list_classes: false,
        }),
    );
    let unknown = Pipeline::new(
        labels(),
        registry,
        Scripted(vec![hand()]),
        Config::default(),
    )
    .unwrap();
    let outcome = unknown.process_detailed(input.clone(), ModelName::Knn);
    assert!(outcome.prediction.is_none());
    assert_eq!(outcome.frame, input);
}

#[test]
fn switching_models_between_frames() {
    let pipeline = pipeline(
        Scripted(vec![hand()]),
        &[(ModelName::Knn, 0), (ModelName::RandomForest, 1)],
    );
    let selection = ModelSelection::new(ModelName::Knn);

    let first = pipeline.process_selected(blank_frame(ChannelOrder::Rgb), &selection);
    selection.set(ModelName::RandomForest);
    let second = pipeline.process_selected(blank_frame(ChannelOrder::Rgb), &selection);

    // same hand, same box, different label text
    assert_ne!(first, second);
    let detailed = pipeline.process_detailed(blank_frame(ChannelOrder::Rgb), selection.get());
    assert_eq!(detailed.prediction.unwrap().label, "B");
    assert_eq!(detailed.frame, second);
}

#[test]
fn bgr_frames_get_a_blue_box() {
    let pipeline = pipeline(Scripted(vec![hand()]), &[(ModelName::Svm, 0)]);
    let frame = pipeline.process(blank_frame(ChannelOrder::Bgr), ModelName::Svm);

    assert_eq!(frame.channel_order(), ChannelOrder::Bgr);
    let offset = (120 * 320 + 70) * 3;
    assert_eq!(&frame.data()[offset..offset + 3], &[255, 0, 0]);
    assert_eq!(frame.get(70, 120), Color::BLUE);
}

#[test]
fn startup_validation() {
    // model expects a different feature length
    let mut mismatched = ModelRegistry::new();
    mismatched.insert(
        ModelName::Knn,
        Box::new(Constant {
            dim: 42,
            class: 0,
            list_classes: true,
        }),
    );
    match Pipeline::new(labels(), mismatched, Scripted(Vec::new()), Config::default()) {
        Err(Error::DimensionMismatch { expected, actual }) => {
            assert_eq!((expected, actual), (84, 42))
        }
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("pipeline accepted a mismatched model"),
    }

    // model can predict a class without label
    match Pipeline::new(
        labels(),
        registry(&[(ModelName::Svm, 2)]),
        Scripted(Vec::new()),
        Config::default(),
    ) {
        Err(Error::Config { reason, .. }) => assert!(reason.contains("class 2"), "{reason}"),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("pipeline accepted a model with unlabeled classes"),
    }
}

#[test]
fn concurrent_frames() {
    let pipeline = pipeline(
        Scripted(vec![hand()]),
        &[(ModelName::Knn, 0), (ModelName::Svm, 1)],
    );

    let labels = std::thread::scope(|s| {
        let handles = (0..8)
            .map(|i| {
                let pipeline = &pipeline;
                s.spawn(move || {
                    let model = if i % 2 == 0 {
                        ModelName::Knn
                    } else {
                        ModelName::Svm
                    };
                    pipeline
                        .process_detailed(blank_frame(ChannelOrder::Rgb), model)
                        .prediction
                        .unwrap()
                        .label
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(labels, ["A", "B", "A", "B", "A", "B", "A", "B"]);
}
