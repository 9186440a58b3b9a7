use crate::{error::Error, util, RequestData, ResponseData};
use futures::{channel::oneshot, Future};
use hyper::{
    body,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use std::{
    convert::Infallible,
    net::{SocketAddr, TcpListener, ToSocketAddrs},
    sync::Arc,
    thread::{self, JoinHandle},
};
use tokio::runtime::Runtime;

/// Answers one request. Implementations are shared between connections and must be safe to call
/// concurrently.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: RequestData) -> ResponseData;
}

impl<F> RequestHandler for F
where
    F: Fn(RequestData) -> ResponseData + Send + Sync,
{
    fn handle(&self, request: RequestData) -> ResponseData {
        self(request)
    }
}

/// Serves `handler` on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    shutdown: F,
) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    listener.set_nonblocking(true)?;

    // connections close after each response so a graceful shutdown never waits on idle clients
    let server = Server::from_tcp(listener)?
        .http1_keepalive(false)
        .serve(make_service_fn(move |_| {
            let handler = handler.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(respond(handler, request).await) }
                }))
            }
        }));

    server.with_graceful_shutdown(shutdown).await?;

    Ok(())
}

async fn respond(handler: Arc<dyn RequestHandler>, mut request: Request<Body>) -> Response<Body> {
    let result = match read_request_data(&mut request).await {
        Ok(request_data) => {
            tracing::debug!(request = %request_data, "handling request");
            build_response(handler.handle(request_data))
        }
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        tracing::error!("Couldn't answer the request: {}", e);
        let mut response = Response::new(Body::empty());
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

async fn read_request_data(request: &mut Request<Body>) -> Result<RequestData, Error> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = util::parse_query(request.uri().query());
    let headers = util::extract_headers(request.headers());

    let body = body::to_bytes(request.body_mut())
        .await
        .map_err(|_| Error::InvalidBody)?;

    Ok(RequestData {
        method,
        path,
        query,
        headers,
        body: String::from_utf8_lossy(&body).into(),
    })
}

fn build_response(response_data: ResponseData) -> Result<Response<Body>, Error> {
    let mut response_builder = Response::builder().status(response_data.status_code);

    util::put_headers(
        response_builder.headers_mut().ok_or(Error::InvalidBody)?,
        &response_data.headers,
    )?;

    Ok(response_builder.body(response_data.body.into())?)
}

/// A listener running on its own thread and runtime. The socket is released when the handle is
/// shut down or dropped.
#[derive(Debug)]
pub struct ListenerHandle {
    address: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn spawn<A: ToSocketAddrs>(
        address: A,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(address)?;
        let address = listener.local_addr()?;
        let runtime = Runtime::new()?;
        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

        let join_handle = thread::Builder::new()
            .name(format!("accord-listener-{}", address.port()))
            .spawn(move || {
                let shutdown = async {
                    let _ = shutdown_receiver.await;
                };

                if let Err(e) = runtime.block_on(serve(listener, handler, shutdown)) {
                    tracing::error!(%address, "Listener error: {}", e);
                }
            })?;

        tracing::debug!(%address, "listening");

        Ok(Self {
            address,
            shutdown: Some(shutdown_sender),
            join_handle: Some(join_handle),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                tracing::error!(address = %self.address, "Listener thread panicked");
            }
            tracing::debug!(address = %self.address, "listener released");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpClient, HyperHttpClient};

    #[test]
    fn test_listener_serves_and_releases_its_port() {
        let handler: Arc<dyn RequestHandler> = Arc::new(|request: RequestData| {
            ResponseData::new(202).with_header("x-path", request.path)
        });
        let mut listener = ListenerHandle::spawn("127.0.0.1:0", handler.clone()).unwrap();
        let address = listener.address();

        let response = Runtime::new()
            .unwrap()
            .block_on(
                HyperHttpClient::new()
                    .make_request(&listener.base_url(), &RequestData::new("GET", "/ping")),
            )
            .unwrap();

        assert_eq!(response.status_code, 202);
        assert_eq!(response.header("x-path").map(String::as_str), Some("/ping"));

        listener.shutdown();
        assert!(ListenerHandle::spawn(address, handler).is_ok());
    }
}
