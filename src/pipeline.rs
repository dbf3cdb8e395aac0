//! The per-frame classification pipeline.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use crate::annotate::{annotate, BoundingBox};
use crate::classifier::{ModelName, ModelRegistry};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::features::normalize;
use crate::image::Frame;
use crate::labels::LabelTable;
use crate::landmark::LandmarkExtractor;
use crate::timer::Timer;

/// A classified gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub model: ModelName,
    pub class: u32,
    pub label: String,
}

/// Everything [`Pipeline::process_detailed`] found out about a frame.
#[derive(Debug)]
pub struct FrameOutcome {
    /// The (possibly annotated) frame.
    pub frame: Frame,
    /// The classification, if a hand was detected and classified.
    pub prediction: Option<Prediction>,
    /// The box drawn around the hands, if any.
    pub bbox: Option<BoundingBox>,
}

/// Turns camera frames into annotated frames.
///
/// Every frame goes through landmark extraction, feature normalization, classification with the
/// requested model, and annotation. Frames without hands are returned unchanged.
///
/// A [`Pipeline`] keeps no per-frame state and all methods take `&self`, so it can be shared
/// between threads (eg. in an [`Arc`]) to process frames concurrently.
pub struct Pipeline {
    labels: Arc<LabelTable>,
    registry: Arc<ModelRegistry>,
    extractor: Box<dyn LandmarkExtractor>,
    config: Config,
    t_extract: Timer,
    t_normalize: Timer,
    t_classify: Timer,
    t_annotate: Timer,
}

impl Pipeline {
    /// Creates a pipeline, verifying that `labels`, `registry`, and `config` fit together.
    ///
    /// Fails with [`Error::DimensionMismatch`] if a model does not accept
    /// [`Config::feature_dim`] features, and with [`Error::Config`] if a model can predict a class
    /// that has no label.
    pub fn new<E: LandmarkExtractor + 'static>(
        labels: impl Into<Arc<LabelTable>>,
        registry: impl Into<Arc<ModelRegistry>>,
        extractor: E,
        config: Config,
    ) -> Result<Self> {
        let labels = labels.into();
        let registry = registry.into();

        registry.check_dim(config.feature_dim())?;
        for (name, model) in registry.iter() {
            let Some(classes) = model.classes() else {
                log::debug!("model '{name}' does not list its classes, skipping label check");
                continue;
            };
            if let Some(class) = classes.into_iter().find(|&c| !labels.contains(c)) {
                return Err(Error::config(
                    config.labels_path(),
                    format!("model '{name}' can predict class {class}, which has no label"),
                ));
            }
        }
        if registry.is_empty() {
            log::warn!("no models loaded, every frame with a hand will fail to classify");
        }

        Ok(Self {
            labels,
            registry,
            extractor: Box::new(extractor),
            config,
            t_extract: Timer::new("extract"),
            t_normalize: Timer::new("normalize"),
            t_classify: Timer::new("classify"),
            t_annotate: Timer::new("annotate"),
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Classifies and annotates `frame` with `model`.
    ///
    /// Errors are logged and the frame is returned unannotated.
    pub fn process(&self, frame: Frame, model: ModelName) -> Frame {
        self.process_detailed(frame, model).frame
    }

    /// Processes `frame` with the model currently stored in `selection`.
    ///
    /// The selection is read once, so a concurrent change takes effect with the next frame.
    pub fn process_selected(&self, frame: Frame, selection: &ModelSelection) -> Frame {
        self.process(frame, selection.get())
    }

    /// Like [`Pipeline::process`], but also returns the prediction and bounding box.
    pub fn process_detailed(&self, mut frame: Frame, model: ModelName) -> FrameOutcome {
        match self.classify(&frame, model) {
            Ok(Some((prediction, bbox))) => {
                log::trace!("{:?} -> {:?} at {:?}", frame, prediction, bbox);
                self.t_annotate.time(|| {
                    annotate(&mut frame, &bbox, &prediction.label, self.config.style())
                });
                FrameOutcome {
                    frame,
                    prediction: Some(prediction),
                    bbox: Some(bbox),
                }
            }
            Ok(None) => FrameOutcome {
                frame,
                prediction: None,
                bbox: None,
            },
            Err(e) => {
                log::warn!("failed to classify frame, passing it through: {e}");
                FrameOutcome {
                    frame,
                    prediction: None,
                    bbox: None,
                }
            }
        }
    }

    fn classify(
        &self,
        frame: &Frame,
        model: ModelName,
    ) -> Result<Option<(Prediction, BoundingBox)>> {
        let image = frame.to_rgb_image();
        let hands = self.t_extract.time(|| self.extractor.detect(&image))?;
        let bias = self.config.bbox_bias();
        let Some(bbox) = BoundingBox::from_landmarks_with_bias(&hands, frame.resolution(), bias)
        else {
            log::trace!("no hand in {:?}", frame);
            return Ok(None);
        };

        let features = self
            .t_normalize
            .time(|| normalize(&hands, self.config.feature_dim()))?;
        let class = self
            .t_classify
            .time(|| self.registry.predict(model, &features))?;
        let label = self.labels.label(class)?;

        Ok(Some((
            Prediction {
                model,
                class,
                label: label.to_string(),
            },
            bbox,
        )))
    }

    /// Returns the profiling timers of all stages, followed by those of the extractor.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [
            &self.t_extract,
            &self.t_normalize,
            &self.t_classify,
            &self.t_annotate,
        ]
        .into_iter()
        .chain(self.extractor.timers())
    }
}

/// A shared, thread-safe handle to the currently selected model.
///
/// Clones refer to the same selection, so a UI thread can switch models while frames are being
/// processed elsewhere.
#[derive(Debug, Clone)]
pub struct ModelSelection(Arc<AtomicU8>);

impl ModelSelection {
    pub fn new(model: ModelName) -> Self {
        Self(Arc::new(AtomicU8::new(Self::encode(model))))
    }

    pub fn get(&self) -> ModelName {
        ModelName::ALL[usize::from(self.0.load(Ordering::Relaxed))]
    }

    pub fn set(&self, model: ModelName) {
        log::debug!("selecting model '{model}'");
        self.0.store(Self::encode(model), Ordering::Relaxed);
    }

    fn encode(model: ModelName) -> u8 {
        ModelName::ALL
            .iter()
            .position(|&m| m == model)
            .expect("every model is in `ModelName::ALL`") as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_shared() {
        let selection = ModelSelection::new(ModelName::Knn);
        let handle = selection.clone();
        assert_eq!(selection.get(), ModelName::Knn);

        std::thread::spawn(move || handle.set(ModelName::RandomForest))
            .join()
            .unwrap();
        assert_eq!(selection.get(), ModelName::RandomForest);
    }

    struct Timed(Timer);

    impl LandmarkExtractor for Timed {
        fn detect(&self, _: &crate::image::Image) -> Result<Vec<crate::landmark::HandLandmarks>> {
            self.0.time(|| Ok(Vec::new()))
        }

        fn timers(&self) -> Vec<&Timer> {
            vec![&self.0]
        }
    }

    #[test]
    fn timers_include_extractor_stages() {
        let labels = LabelTable::parse("0 A").unwrap();
        let pipeline = Pipeline::new(
            labels,
            ModelRegistry::new(),
            Timed(Timer::new("palm")),
            Config::default(),
        )
        .unwrap();
        let frame = Frame::from_image(crate::image::Image::new(8, 8));
        pipeline.process(frame, ModelName::Knn);

        let timers = pipeline.timers().map(|t| t.to_string()).collect::<Vec<_>>();
        assert_eq!(timers.len(), 5);
        assert!(timers[0].starts_with("extract: 1x"), "{timers:?}");
        assert!(timers[4].starts_with("palm: 1x"), "{timers:?}");
    }

    #[test]
    fn pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
