mod services;

pub use services::{
    delete_picture, put_picture, PictureError, PictureUpload, ALLOWED_CONTENT_TYPES,
    MAX_PICTURE_BYTES,
};
