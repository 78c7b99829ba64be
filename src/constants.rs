/// ARTIFACT_VERSION is the on-disk version of the exported model artifact.
pub const ARTIFACT_VERSION: u8 = 1;

/// SAMPLE_RATE is the sample rate every clip is normalized to before
/// feature extraction.
pub const SAMPLE_RATE: usize = 16_000;

/// CLIP_SECONDS is the fixed duration of one recorded sample.
pub const CLIP_SECONDS: f32 = 1.0;

/// CLIP_SAMPLES is the exact sample count of a duration-normalized clip.
pub const CLIP_SAMPLES: usize = SAMPLE_RATE;

/// MFCC_COEFFS is the number of cepstral coefficients kept per frame.
pub const MFCC_COEFFS: usize = 13;

/// MFCC_FRAMES is the number of analysis frames in one feature grid.
pub const MFCC_FRAMES: usize = 40;

/// FFT_SIZE is the transform window of the short-time analysis.
pub const FFT_SIZE: usize = 512;

/// HOP_SIZE makes a 1 s clip at [`SAMPLE_RATE`] produce [`MFCC_FRAMES`]
/// frames.
pub const HOP_SIZE: usize = SAMPLE_RATE / MFCC_FRAMES;

/// MEL_BANDS is the number of triangular mel filters.
pub const MEL_BANDS: usize = 40;

/// TRAIN_FRACTION / VAL_FRACTION of the pooled examples go to the train and
/// validation splits; the remainder is the test split.
pub const TRAIN_FRACTION: f32 = 0.8;
pub(crate) const VAL_FRACTION: f32 = 0.1;

/// SPLIT_SEED fixes the dataset shuffle so splits are reproducible.
pub const SPLIT_SEED: u64 = 42;

/// AUGMENT_NOISE_STD is the σ of the additive Gaussian noise variant.
pub(crate) const AUGMENT_NOISE_STD: f32 = 0.005;

/// PITCH_SHIFT_SEMITONES is the shift applied by the pitch variant.
pub(crate) const PITCH_SHIFT_SEMITONES: f32 = 2.0;

/// TIME_STRETCH_RATE is the speed-up applied by the stretch variant.
pub(crate) const TIME_STRETCH_RATE: f32 = 1.1;

/// BATCH_SIZE used while fitting the classifier.
pub(crate) const BATCH_SIZE: usize = 32;

/// DEFAULT_EPOCHS when `--epochs` is not given.
pub const DEFAULT_EPOCHS: usize = 50;

/// LEARNING_RATE of the AdamW optimizer.
pub(crate) const LEARNING_RATE: f64 = 1e-3;

/// SAMPLES_PER_WORD recorded in one recorder run-through.
pub const SAMPLES_PER_WORD: usize = 20;

/// RECORD_OUTPUT_DIR is where the recorder writes its per-label tree.
pub const RECORD_OUTPUT_DIR: &str = "dataset";

/// DEFAULT_MODEL_PATH is the artifact the evaluator falls back to.
pub const DEFAULT_MODEL_PATH: &str = "modelo_comandos.kwm";
