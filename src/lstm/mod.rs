/*!
The close-price LSTM: two recurrent layers, a dense layer and a single output, trained per forecast horizon
*/

use crate::window::Windows;
use crate::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tch::nn::{self, Linear, Module, ModuleT, OptimizerConfig, RNNConfig, VarStore, LSTM, RNN};
use tch::{Device, Kind, Reduction, Tensor};

/// Something that maps lookback windows to predictions in the same (scaled) units as its targets
pub trait Forecaster {
    /// Predict one value per window
    fn predict(&self, inputs: &[Vec<f32>]) -> Result<Vec<f32>>;

    /// Persist the fitted parameters, if the forecaster has any
    fn save(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Something that fits a [`Forecaster`] to a set of training windows
pub trait Trainer {
    /// Fit a forecaster to `windows`
    fn fit(&self, windows: &Windows) -> Result<Box<dyn Forecaster>>;
}

/// The close-price LSTM
#[derive(Debug)]
pub struct CloseLSTM {
    /// The first recurrent layer, returning the full sequence
    pub first: LSTM,
    /// The second recurrent layer, of which only the last step is kept
    pub second: LSTM,
    /// The dense layer between the recurrent layers and the output
    pub dense: Linear,
    /// The single-neuron output layer
    pub output: Linear,
    /// Dropout probability applied after each recurrent layer while training
    pub dropout: f64,
}

impl CloseLSTM {
    /// Mean squared error of the model on a batch
    pub fn loss(&self, xs: &Tensor, ys: &Tensor, train: bool) -> Tensor {
        self.forward_t(xs, train).mse_loss(ys, Reduction::Mean)
    }
}

impl ModuleT for CloseLSTM {
    /// Map `[batch, lookback, features]` to `[batch, 1]`
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let (hidden, _) = self.first.seq(xs);
        let hidden = hidden.dropout(self.dropout, train);
        let (hidden, _) = self.second.seq(&hidden);
        let last = hidden.select(1, -1).dropout(self.dropout, train);
        self.output.forward(&self.dense.forward(&last))
    }
}

/// A descriptor for an instance of the CloseLSTM model
#[derive(Debug, Clone, PartialEq)]
pub struct CloseLSTMDesc {
    /// Features per observation
    pub inputs: usize,
    /// Hidden size of the first recurrent layer
    pub first_hidden: usize,
    /// Hidden size of the second recurrent layer
    pub second_hidden: usize,
    /// Width of the dense layer
    pub dense: usize,
    /// Dropout probability after each recurrent layer
    pub dropout: f64,
}

impl Default for CloseLSTMDesc {
    fn default() -> Self {
        CloseLSTMDesc {
            inputs: 1,
            first_hidden: 60,
            second_hidden: 120,
            dense: 20,
            dropout: 0.3,
        }
    }
}

impl CloseLSTMDesc {
    /// Build a `CloseLSTM` over a given `VarStore`
    pub fn build(&self, vs: &VarStore) -> CloseLSTM {
        let root = vs.root();
        let config = RNNConfig {
            has_biases: true,
            num_layers: 1,
            dropout: 0.,
            train: true,
            bidirectional: false,
            batch_first: true,
            ..Default::default()
        };
        let first = nn::lstm(
            &root / "first",
            self.inputs as i64,
            self.first_hidden as i64,
            config,
        );
        let second = nn::lstm(
            &root / "second",
            self.first_hidden as i64,
            self.second_hidden as i64,
            config,
        );
        let dense = nn::linear(
            &root / "dense",
            self.second_hidden as i64,
            self.dense as i64,
            Default::default(),
        );
        let output = nn::linear(&root / "output", self.dense as i64, 1, Default::default());
        CloseLSTM {
            first,
            second,
            dense,
            output,
            dropout: self.dropout,
        }
    }
}

/// Parse a device name: `cuda` (falling back to the CPU when unavailable) or `cpu`
pub fn device_from_name(name: &str) -> Result<Device> {
    match name {
        "cuda" => Ok(Device::cuda_if_available()),
        "cpu" => Ok(Device::Cpu),
        device => Err(Error::Config(format!("Invalid value for device: {:?}", device))),
    }
}

/// Package windows into a `[windows, lookback, 1]` input tensor
pub fn input_tensor(inputs: &[Vec<f32>], device: Device) -> Tensor {
    let lookback = inputs.first().map(|w| w.len()).unwrap_or(0);
    let flat: Vec<f32> = inputs.iter().flatten().copied().collect();
    Tensor::from_slice(&flat)
        .view([inputs.len() as i64, lookback as i64, 1])
        .to_device(device)
}

/// Trains a fresh [`CloseLSTM`] with Adam on shuffled mini-batches
#[derive(Debug, Clone)]
pub struct LstmTrainer {
    /// The model to build
    pub desc: CloseLSTMDesc,
    /// Device to train and predict on
    pub device: Device,
    /// Passes over the training windows
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Seed for libtorch's RNG, for reproducible runs
    pub seed: Option<i64>,
    /// Draw an epoch progress bar
    pub progress: bool,
}

impl Trainer for LstmTrainer {
    fn fit(&self, windows: &Windows) -> Result<Box<dyn Forecaster>> {
        if windows.is_empty() {
            return Err(Error::InsufficientData { have: 0, need: 1 });
        }
        if let Some(seed) = self.seed {
            tch::manual_seed(seed);
        }
        let vs = VarStore::new(self.device);
        let model = self.desc.build(&vs);
        let mut opt = nn::Adam::default().build(&vs, self.learning_rate)?;

        let samples = windows.len();
        let xs = input_tensor(&windows.inputs, self.device);
        let ys = Tensor::from_slice(&windows.targets)
            .view([samples as i64, 1])
            .to_device(self.device);
        let batch_size = self.batch_size.max(1);

        let epochs_progress = if self.progress {
            let bar = ProgressBar::new(self.epochs as u64);
            if let Ok(style) = ProgressStyle::default_bar().template("Epochs: {wide_bar} {pos}/{len}: {msg}") {
                bar.set_style(style)
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        for epoch in 0..self.epochs {
            let permutation = Tensor::randperm(samples as i64, (Kind::Int64, self.device));
            let mut sum_loss = 0.0;
            let mut batches = 0;
            for start in (0..samples).step_by(batch_size) {
                let len = batch_size.min(samples - start);
                let index = permutation.narrow(0, start as i64, len as i64);
                let input_batch = xs.index_select(0, &index);
                let output_batch = ys.index_select(0, &index);
                let loss = model.loss(&input_batch, &output_batch, true);
                opt.backward_step(&loss);
                sum_loss += loss.double_value(&[]);
                batches += 1;
            }
            let average = sum_loss / batches as f64;
            tracing::trace!(epoch, horizon = windows.horizon, loss = average, "epoch finished");
            epochs_progress.set_message(format!("loss = {:.5}", average));
            epochs_progress.inc(1);
        }
        epochs_progress.finish_and_clear();

        Ok(Box::new(TrainedLSTM {
            vs,
            model,
            device: self.device,
        }))
    }
}

/// A fitted [`CloseLSTM`] together with the variables backing it
#[derive(Debug)]
pub struct TrainedLSTM {
    /// The variables backing `model`
    pub vs: VarStore,
    /// The fitted model
    pub model: CloseLSTM,
    /// Device the model lives on
    pub device: Device,
}

impl Forecaster for TrainedLSTM {
    fn predict(&self, inputs: &[Vec<f32>]) -> Result<Vec<f32>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let predictions = tch::no_grad(|| {
            let xs = input_tensor(inputs, self.device);
            self.model
                .forward_t(&xs, false)
                .view([-1])
                .to_kind(Kind::Float)
                .to_device(Device::Cpu)
        });
        Ok(Vec::<f32>::try_from(&predictions)?)
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.vs.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::prepare;

    fn trainer(epochs: usize) -> LstmTrainer {
        LstmTrainer {
            desc: CloseLSTMDesc {
                first_hidden: 8,
                second_hidden: 8,
                dense: 4,
                dropout: 0.0,
                ..Default::default()
            },
            device: Device::Cpu,
            epochs,
            batch_size: 8,
            learning_rate: 1e-2,
            seed: Some(42),
            progress: false,
        }
    }

    #[test]
    fn output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let model = CloseLSTMDesc::default().build(&vs);
        let xs = input_tensor(&[vec![0.1; 7], vec![0.2; 7], vec![0.3; 7]], Device::Cpu);
        assert_eq!(xs.size3().unwrap(), (3, 7, 1));
        let ys = model.forward_t(&xs, false);
        assert_eq!(ys.size2().unwrap(), (3, 1));
    }

    #[test]
    fn learns_a_constant_target() {
        let series = vec![0.5f32; 40];
        let windows = prepare(&series, 7, 1).unwrap();
        let forecaster = trainer(60).fit(&windows).unwrap();
        let predictions = forecaster.predict(&[windows.last_sequence.clone()]).unwrap();
        assert_eq!(predictions.len(), 1);
        assert!((predictions[0] - 0.5).abs() < 0.25, "predicted {}", predictions[0]);
        assert!(forecaster.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn saves_weights() {
        let series: Vec<f32> = (0..12).map(|i| i as f32 / 12.0).collect();
        let windows = prepare(&series, 7, 2).unwrap();
        let forecaster = trainer(1).fit(&windows).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights/model.ot");
        forecaster.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn devices() {
        assert_eq!(device_from_name("cpu").unwrap(), Device::Cpu);
        assert!(device_from_name("tpu").is_err());
    }
}
