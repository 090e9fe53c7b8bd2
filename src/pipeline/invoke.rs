//! Conversion invoker: call the converter and validate what comes back.

use crate::converter::{ConvertOptions, DocumentConverter};
use crate::error::ProcessingError;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Convert the file at `path`, returning non-empty Markdown.
///
/// # Errors
/// - [`ProcessingError::ConversionFailed`] — no result or an empty string
/// - [`ProcessingError::ConversionError`]  — the converter reported a fault
/// - [`ProcessingError::ConversionTimeout`] — `timeout` elapsed first; the
///   converter future is dropped
pub async fn invoke(
    converter: &dyn DocumentConverter,
    path: &Path,
    options: &ConvertOptions,
    timeout: Option<Duration>,
) -> Result<String, ProcessingError> {
    debug!("Invoking {} (keep_data_uris={})", converter.name(), options.keep_data_uris);

    let call = converter.convert(path, options);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
            ProcessingError::ConversionTimeout {
                secs: limit.as_secs(),
            }
        })?,
        None => call.await,
    };

    match result {
        Ok(Some(text)) if !text.is_empty() => Ok(text),
        Ok(_) => Err(ProcessingError::ConversionFailed),
        Err(fault) => Err(ProcessingError::ConversionError {
            message: fault.message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterFault;
    use async_trait::async_trait;

    enum Behaviour {
        Text(&'static str),
        Nothing,
        Fault(&'static str),
        Hang,
    }

    struct Fake(Behaviour);

    #[async_trait]
    impl DocumentConverter for Fake {
        async fn convert(
            &self,
            _path: &Path,
            _options: &ConvertOptions,
        ) -> Result<Option<String>, ConverterFault> {
            match self.0 {
                Behaviour::Text(t) => Ok(Some(t.to_string())),
                Behaviour::Nothing => Ok(None),
                Behaviour::Fault(m) => Err(ConverterFault::new(m)),
                Behaviour::Hang => std::future::pending().await,
            }
        }
    }

    async fn run(b: Behaviour, timeout: Option<Duration>) -> Result<String, ProcessingError> {
        invoke(&Fake(b), Path::new("x.pdf"), &ConvertOptions::default(), timeout).await
    }

    #[tokio::test]
    async fn text_is_returned() {
        assert_eq!(run(Behaviour::Text("# Hi"), None).await.unwrap(), "# Hi");
    }

    #[tokio::test]
    async fn whitespace_only_text_is_still_a_result() {
        assert_eq!(run(Behaviour::Text(" \n"), None).await.unwrap(), " \n");
    }

    #[tokio::test]
    async fn empty_text_fails() {
        assert!(matches!(
            run(Behaviour::Text(""), None).await,
            Err(ProcessingError::ConversionFailed)
        ));
    }

    #[tokio::test]
    async fn no_result_fails() {
        assert!(matches!(
            run(Behaviour::Nothing, None).await,
            Err(ProcessingError::ConversionFailed)
        ));
    }

    #[tokio::test]
    async fn fault_message_is_preserved() {
        match run(Behaviour::Fault("FileConversionException: corrupt"), None).await {
            Err(ProcessingError::ConversionError { message }) => {
                assert_eq!(message, "FileConversionException: corrupt")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_elapses() {
        let err = run(Behaviour::Hang, Some(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::ConversionTimeout { secs: 5 }));
    }
}
