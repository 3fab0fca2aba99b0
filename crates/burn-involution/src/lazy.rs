use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

use crate::{Involution3d, InvolutionConfig, InvolutionError};

/// Build state of a [lazy involution](LazyInvolution3d).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvolutionState {
    /// No input was seen yet, so no parameter exists.
    Unbuilt,
    /// The parameters were created for inputs with `channels_in` channels.
    Built {
        /// Input channel count the layer is bound to.
        channels_in: usize,
    },
}

/// An [involution](Involution3d) whose parameters are created from the first input it sees.
///
/// The sub-mapping shapes depend on the input channel count. This wrapper defers
/// [init](InvolutionConfig::init) until that count is known, then stays bound to it.
#[derive(Debug)]
pub struct LazyInvolution3d<B: Backend> {
    config: InvolutionConfig,
    device: B::Device,
    module: Option<Involution3d<B>>,
}

impl<B: Backend> LazyInvolution3d<B> {
    /// Create an unbuilt layer that will be initialized on `device`.
    pub fn new(config: InvolutionConfig, device: &B::Device) -> Self {
        Self {
            config,
            device: device.clone(),
            module: None,
        }
    }

    /// The configuration of the layer.
    pub fn config(&self) -> &InvolutionConfig {
        &self.config
    }

    /// The current build state.
    pub fn state(&self) -> InvolutionState {
        match &self.module {
            Some(module) => InvolutionState::Built {
                channels_in: module.channels_in,
            },
            None => InvolutionState::Unbuilt,
        }
    }

    /// The built module, if any.
    pub fn module(&self) -> Option<&Involution3d<B>> {
        self.module.as_ref()
    }

    /// Consumes the wrapper, returning the built module if any.
    pub fn into_module(self) -> Option<Involution3d<B>> {
        self.module
    }

    /// Builds the layer for `channels_in` input channels, or checks that the built layer matches.
    pub fn build(&mut self, channels_in: usize) -> Result<&Involution3d<B>, InvolutionError> {
        let config = &self.config;
        let device = &self.device;

        let module = self.module.get_or_insert_with(|| {
            log::debug!("Building lazy involution for {channels_in} input channels");
            config.init(channels_in, device)
        });

        if module.channels_in != channels_in {
            return Err(InvolutionError::ChannelMismatch {
                expected: module.channels_in,
                found: channels_in,
            });
        }

        Ok(module)
    }

    /// Builds the layer on the first call, then applies the forward pass.
    ///
    /// See [Involution3d::try_forward].
    pub fn try_forward(&mut self, input: Tensor<B, 5>) -> Result<Tensor<B, 5>, InvolutionError> {
        let [_, _, _, _, channels_in] = input.dims();

        self.build(channels_in)?.try_forward(input)
    }

    /// Builds the layer on the first call, then applies the forward pass.
    ///
    /// # Panics
    ///
    /// When [try_forward](LazyInvolution3d::try_forward) returns an error.
    pub fn forward(&mut self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        match self.try_forward(input) {
            Ok(output) => output,
            Err(err) => panic!("{err}"),
        }
    }
}
