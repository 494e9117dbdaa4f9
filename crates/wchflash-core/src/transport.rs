//! Transport abstraction
//!
//! The engine needs exactly one thing from the link: send a request and
//! receive a reply, atomically. USB does this with two bulk transfers, the
//! serial link with a framed write followed by a framed read.

use crate::error::TransportError;

/// A link to the bootloader
pub trait Transport {
    /// Send `request` and receive up to `response_len` bytes of reply
    ///
    /// The exchange is atomic from the caller's point of view: either both
    /// legs complete or the whole exchange fails. No retries are attempted.
    fn exchange(&mut self, request: &[u8], response_len: usize)
        -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).exchange(request, response_len)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).exchange(request, response_len)
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! Transport that replays canned replies and records requests

    use std::collections::VecDeque;

    use super::Transport;
    use crate::error::TransportError;

    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub replies: VecDeque<Result<Vec<u8>, TransportError>>,
        pub requests: Vec<(Vec<u8>, usize)>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&mut self, bytes: &[u8]) -> &mut Self {
            self.replies.push_back(Ok(bytes.to_vec()));
            self
        }

        pub fn fail(&mut self, error: TransportError) -> &mut Self {
            self.replies.push_back(Err(error));
            self
        }
    }

    impl Transport for ScriptedTransport {
        fn exchange(
            &mut self,
            request: &[u8],
            response_len: usize,
        ) -> Result<Vec<u8>, TransportError> {
            self.requests.push((request.to_vec(), response_len));
            let mut reply = self
                .replies
                .pop_front()
                .unwrap_or(Err(TransportError::Timeout))?;
            reply.truncate(response_len);
            Ok(reply)
        }
    }
}
