pub mod resizer;

pub use resizer::{
    ContentCache, ContentTypeResizer, HttpFetcher, RequestContext, ResizeError, ResizePipeline,
    ResizedImage,
};
