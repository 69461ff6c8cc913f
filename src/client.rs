//! The service client: one asynchronous method per operation.

use std::io::Write;
use std::path::Path;

use log::debug;
use reqwest::multipart::{Form, Part};

use crate::convert::{CONVERT_PATH, ConvertRequest};
use crate::environment::{Environment, default_environment};
use crate::error::{Error, Operation, Result};
use crate::file::{
    DELETE_FILE_PATH, DeleteFileRequest, GET_FILE_PATH, GetFileRequest, LIST_FILES_PATH,
    ListFilesRequest, ListFilesResponse, PUT_FILE_PATH, PutFileRequest, RENAME_FILES_PATH,
    RenameFilesRequest,
};
use crate::http::{Download, HttpEngine};
use crate::image::{
    DELETE_IMAGE_PATH, DeleteImageRequest, GET_IMAGE_PATH, GetImageRequest, LIST_IMAGES_PATH,
    ListImagesRequest, ListImagesResponse, UPLOAD_IMAGE_PATH, UploadImageRequest,
    UploadImageResponse,
};
use crate::render::{RENDER_PATH, RenderRequest, RenderResponse};
use crate::rendertags::{GET_RENDER_TAGS_PATH, GetRenderTagsRequest, RenderTagsResponse};
use crate::response::{DownloadResponse, ResponseStatus};
use crate::template::{
    DELETE_TEMPLATE_PATH, DeleteTemplateRequest, GET_SAMPLE_DATA_PATH, GET_TEMPLATE_DETAILS_PATH,
    GET_TEMPLATE_PATH, GET_TEMPLATE_STRUCTURE_PATH, GetSampleDataRequest,
    GetTemplateDetailsRequest, GetTemplateRequest, GetTemplateStructureRequest, LIST_TEMPLATES_PATH,
    ListTemplatesRequest, ListTemplatesResponse, SampleData, SampleDataFormat, SampleDataResponse,
    TemplateDetailsResponse, TemplateStructureResponse, UPLOAD_TEMPLATE_PATH,
    UploadTemplateRequest, UploadTemplateResponse,
};

/// Wire envelopes for JSON operation responses (internal).
mod wire {
    use serde::Deserialize;

    use crate::file::FileDetails;
    use crate::image::ImageDetails;
    use crate::rendertags::RenderTagPeriod;
    use crate::template::TemplateDetails;

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct TemplateList {
        #[serde(default)]
        pub template_list: Vec<TemplateDetails>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct TemplateEnvelope {
        pub template_details: Option<TemplateDetails>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct TemplateStructure {
        pub template_structure: Option<serde_json::Value>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct ImageList {
        #[serde(default)]
        pub image_list: Vec<ImageDetails>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct ImageEnvelope {
        pub image_details: Option<ImageDetails>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct FileList {
        #[serde(default)]
        pub file_list: Vec<FileDetails>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct RenderTags {
        #[serde(default)]
        pub render_tags: Vec<RenderTagPeriod>,
    }
}

/// Client for the document generation web services.
///
/// Built from an explicit [`Environment`], or from the process-wide default
/// set via [`crate::set_default_environment`]. Every method resolves the
/// effective environment per call: a request-level override wins over the
/// client's environment, which wins over the process default the client was
/// built from. Validation (environment and request) happens before any
/// network traffic.
///
/// Business failures reported by the service come back as responses whose
/// `succeeded()` is false; callers check that in addition to handling
/// returned errors.
pub struct DwsClient {
    env: Environment,
    engine: HttpEngine,
}

enum EngineHandle<'a> {
    Shared(&'a HttpEngine),
    Owned(HttpEngine),
}

impl EngineHandle<'_> {
    fn get(&self) -> &HttpEngine {
        match self {
            EngineHandle::Shared(engine) => engine,
            EngineHandle::Owned(engine) => engine,
        }
    }
}

impl DwsClient {
    /// Create a client for the given environment.
    pub fn new(env: Environment) -> Result<Self> {
        env.validate(false)?;
        let engine = HttpEngine::new(&env)?;
        Ok(Self { env, engine })
    }

    /// Create a client from the process-wide default environment.
    pub fn from_default_environment() -> Result<Self> {
        let env = default_environment().cloned().ok_or_else(|| {
            Error::Configuration("no default environment has been set".to_string())
        })?;
        Self::new(env)
    }

    /// The environment this client was built with.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Resolve the effective environment and engine for one call.
    ///
    /// A request-level override gets a fresh engine so its timeouts and
    /// proxy apply; otherwise the client's shared engine is reused.
    fn resolve<'a>(
        &'a self,
        override_env: Option<&'a Environment>,
    ) -> Result<(&'a Environment, EngineHandle<'a>)> {
        match override_env {
            Some(env) => {
                env.validate(env.access_key_mandatory)?;
                Ok((env, EngineHandle::Owned(HttpEngine::new(env)?)))
            }
            None => {
                self.env.validate(self.env.access_key_mandatory)?;
                Ok((&self.env, EngineHandle::Shared(&self.engine)))
            }
        }
    }

    // --- render ---------------------------------------------------------

    /// Render a template, streaming the document into a writer supplied by
    /// `create_writer`. The writer is only created once a successful status
    /// has been seen, and recreated if a broken transfer is retried.
    pub async fn render<W, F>(&self, request: &RenderRequest, create_writer: F) -> Result<RenderResponse>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        debug!("rendering template {}...", request.template_name);

        let fields = with_access_key(env, request.fields());
        let download = engine
            .get()
            .post_form_download(Operation::Render, &env.url_for(RENDER_PATH), &fields, create_writer)
            .await?;

        Ok(match download {
            Download::Document {
                status,
                headers,
                bytes_written,
            } => RenderResponse::from_document(status, &headers, bytes_written),
            Download::Failed(reply) => RenderResponse::from_failure(reply.response_status()),
        })
    }

    /// Render a template and write the document to a file path.
    pub async fn render_to_path(
        &self,
        request: &RenderRequest,
        path: impl AsRef<Path>,
    ) -> Result<RenderResponse> {
        let path = path.as_ref();
        self.render(request, || std::fs::File::create(path)).await
    }

    // --- templates ------------------------------------------------------

    /// List the stored templates.
    pub async fn list_templates(
        &self,
        request: &ListTemplatesRequest,
    ) -> Result<ListTemplatesResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        let reply = engine
            .get()
            .post_form(
                Operation::Template,
                &env.url_for(LIST_TEMPLATES_PATH),
                &with_access_key(env, Vec::new()),
            )
            .await?;

        let status = reply.response_status();
        let templates = if status.succeeded() {
            reply
                .json::<wire::TemplateList>()
                .map(|list| list.template_list)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(ListTemplatesResponse { status, templates })
    }

    /// Upload a template file to the store.
    pub async fn upload_template(
        &self,
        request: &UploadTemplateRequest,
    ) -> Result<UploadTemplateResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        debug!("uploading template {}...", request.file_name);

        let access_key = access_key(env);
        let reply = engine
            .get()
            .post_multipart(Operation::Template, &env.url_for(UPLOAD_TEMPLATE_PATH), || {
                let mut form = form_with_access_key(&access_key);
                if let Some(name) = &request.template_name {
                    form = form.text("templateName", name.clone());
                }
                if let Some(dev_mode) = request.dev_mode {
                    form = form.text("devMode", dev_mode.to_string());
                }
                form.part(
                    "templateFile",
                    Part::bytes(request.content.clone()).file_name(request.file_name.clone()),
                )
            })
            .await?;

        let status = reply.response_status();
        let details = if status.succeeded() {
            reply
                .json::<wire::TemplateEnvelope>()
                .and_then(|e| e.template_details)
        } else {
            None
        };
        Ok(UploadTemplateResponse { status, details })
    }

    /// Download stored templates into a writer supplied by `create_writer`.
    /// More than one name yields a zip archive.
    pub async fn get_template<W, F>(
        &self,
        request: &GetTemplateRequest,
        create_writer: F,
    ) -> Result<DownloadResponse>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        self.download(
            engine,
            Operation::Template,
            &env.url_for(GET_TEMPLATE_PATH),
            with_access_key(env, request.fields()),
            create_writer,
        )
        .await
    }

    /// Download stored templates to a file path.
    pub async fn get_template_to_path(
        &self,
        request: &GetTemplateRequest,
        path: impl AsRef<Path>,
    ) -> Result<DownloadResponse> {
        let path = path.as_ref();
        self.get_template(request, || std::fs::File::create(path)).await
    }

    /// Delete stored templates.
    pub async fn delete_template(&self, request: &DeleteTemplateRequest) -> Result<ResponseStatus> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::Template,
                &env.url_for(DELETE_TEMPLATE_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;
        Ok(reply.response_status())
    }

    /// Fetch the stored metadata of one template.
    pub async fn get_template_details(
        &self,
        request: &GetTemplateDetailsRequest,
    ) -> Result<TemplateDetailsResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::Template,
                &env.url_for(GET_TEMPLATE_DETAILS_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;

        let status = reply.response_status();
        let details = if status.succeeded() {
            reply
                .json::<wire::TemplateEnvelope>()
                .and_then(|e| e.template_details)
        } else {
            None
        };
        Ok(TemplateDetailsResponse { status, details })
    }

    /// Fetch the field/section structure of one template.
    pub async fn get_template_structure(
        &self,
        request: &GetTemplateStructureRequest,
    ) -> Result<TemplateStructureResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::Template,
                &env.url_for(GET_TEMPLATE_STRUCTURE_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;

        let status = reply.response_status();
        let structure = if status.succeeded() {
            reply
                .json::<wire::TemplateStructure>()
                .and_then(|e| e.template_structure)
        } else {
            None
        };
        Ok(TemplateStructureResponse { status, structure })
    }

    /// Generate sample data matching a template's fields.
    pub async fn get_sample_data(
        &self,
        request: &GetSampleDataRequest,
    ) -> Result<SampleDataResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::Template,
                &env.url_for(GET_SAMPLE_DATA_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;

        let status = reply.response_status();
        let data = if status.succeeded() {
            match request.format {
                SampleDataFormat::Json => reply.json().map(SampleData::Json),
                SampleDataFormat::Xml => {
                    Some(SampleData::Xml(String::from_utf8_lossy(reply.body()).into_owned()))
                }
            }
        } else {
            None
        };
        Ok(SampleDataResponse { status, data })
    }

    // --- images ---------------------------------------------------------

    /// List the stored images.
    pub async fn list_images(&self, request: &ListImagesRequest) -> Result<ListImagesResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        let reply = engine
            .get()
            .post_form(
                Operation::Image,
                &env.url_for(LIST_IMAGES_PATH),
                &with_access_key(env, Vec::new()),
            )
            .await?;

        let status = reply.response_status();
        let images = if status.succeeded() {
            reply
                .json::<wire::ImageList>()
                .map(|list| list.image_list)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(ListImagesResponse { status, images })
    }

    /// Upload an image to the store.
    pub async fn upload_image(&self, request: &UploadImageRequest) -> Result<UploadImageResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        debug!("uploading image {}...", request.file_name);

        let access_key = access_key(env);
        let reply = engine
            .get()
            .post_multipart(Operation::Image, &env.url_for(UPLOAD_IMAGE_PATH), || {
                let mut form = form_with_access_key(&access_key);
                if let Some(name) = &request.image_name {
                    form = form.text("imageName", name.clone());
                }
                form.part(
                    "imageFile",
                    Part::bytes(request.content.clone()).file_name(request.file_name.clone()),
                )
            })
            .await?;

        let status = reply.response_status();
        let details = if status.succeeded() {
            reply.json::<wire::ImageEnvelope>().and_then(|e| e.image_details)
        } else {
            None
        };
        Ok(UploadImageResponse { status, details })
    }

    /// Download stored images into a writer supplied by `create_writer`.
    pub async fn get_image<W, F>(
        &self,
        request: &GetImageRequest,
        create_writer: F,
    ) -> Result<DownloadResponse>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        self.download(
            engine,
            Operation::Image,
            &env.url_for(GET_IMAGE_PATH),
            with_access_key(env, request.fields()),
            create_writer,
        )
        .await
    }

    /// Download stored images to a file path.
    pub async fn get_image_to_path(
        &self,
        request: &GetImageRequest,
        path: impl AsRef<Path>,
    ) -> Result<DownloadResponse> {
        let path = path.as_ref();
        self.get_image(request, || std::fs::File::create(path)).await
    }

    /// Delete stored images.
    pub async fn delete_image(&self, request: &DeleteImageRequest) -> Result<ResponseStatus> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::Image,
                &env.url_for(DELETE_IMAGE_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;
        Ok(reply.response_status())
    }

    // --- file storage ---------------------------------------------------

    /// List stored files.
    pub async fn list_files(&self, request: &ListFilesRequest) -> Result<ListFilesResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        let reply = engine
            .get()
            .post_form(
                Operation::File,
                &env.url_for(LIST_FILES_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;

        let status = reply.response_status();
        let files = if status.succeeded() {
            reply
                .json::<wire::FileList>()
                .map(|list| list.file_list)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(ListFilesResponse { status, files })
    }

    /// Store a file.
    pub async fn put_file(&self, request: &PutFileRequest) -> Result<ResponseStatus> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        debug!("storing file {}...", request.file_name);

        let access_key = access_key(env);
        let reply = engine
            .get()
            .post_multipart(Operation::File, &env.url_for(PUT_FILE_PATH), || {
                let mut form =
                    form_with_access_key(&access_key).text("fileName", request.file_name.clone());
                if let Some(content_type) = &request.content_type {
                    form = form.text("contentType", content_type.clone());
                }
                if let Some(meta_data) = &request.meta_data {
                    form = form.text("metaData", meta_data.clone());
                }
                form.part(
                    "file",
                    Part::bytes(request.content.clone()).file_name(request.file_name.clone()),
                )
            })
            .await?;
        Ok(reply.response_status())
    }

    /// Fetch a stored file into a writer supplied by `create_writer`.
    pub async fn get_file<W, F>(
        &self,
        request: &GetFileRequest,
        create_writer: F,
    ) -> Result<DownloadResponse>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        self.download(
            engine,
            Operation::File,
            &env.url_for(GET_FILE_PATH),
            with_access_key(env, request.fields()),
            create_writer,
        )
        .await
    }

    /// Fetch a stored file to a path.
    pub async fn get_file_to_path(
        &self,
        request: &GetFileRequest,
        path: impl AsRef<Path>,
    ) -> Result<DownloadResponse> {
        let path = path.as_ref();
        self.get_file(request, || std::fs::File::create(path)).await
    }

    /// Delete a stored file or folder.
    pub async fn delete_file(&self, request: &DeleteFileRequest) -> Result<ResponseStatus> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::File,
                &env.url_for(DELETE_FILE_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;
        Ok(reply.response_status())
    }

    /// Rename a stored file or folder.
    pub async fn rename_files(&self, request: &RenameFilesRequest) -> Result<ResponseStatus> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::File,
                &env.url_for(RENAME_FILES_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;
        Ok(reply.response_status())
    }

    // --- convert --------------------------------------------------------

    /// Convert a document, streaming the result into a writer supplied by
    /// `create_writer`.
    pub async fn convert<W, F>(
        &self,
        request: &ConvertRequest,
        create_writer: F,
    ) -> Result<DownloadResponse>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        debug!("converting {} to {}...", request.file_name, request.output_name);

        let access_key = access_key(env);
        let url = env.url_for(CONVERT_PATH);
        let download = engine
            .get()
            .post_multipart_download(
                Operation::Convert,
                &url,
                || {
                    form_with_access_key(&access_key)
                        .text("outputName", request.output_name.clone())
                        .part(
                            "file",
                            Part::bytes(request.content.clone())
                                .file_name(request.file_name.clone()),
                        )
                },
                create_writer,
            )
            .await?;
        Ok(download_response(download))
    }

    /// Convert a document and write the result to a path.
    pub async fn convert_to_path(
        &self,
        request: &ConvertRequest,
        path: impl AsRef<Path>,
    ) -> Result<DownloadResponse> {
        let path = path.as_ref();
        self.convert(request, || std::fs::File::create(path)).await
    }

    // --- render tags ----------------------------------------------------

    /// Fetch render statistics for tagged renders.
    pub async fn get_render_tags(
        &self,
        request: &GetRenderTagsRequest,
    ) -> Result<RenderTagsResponse> {
        let (env, engine) = self.resolve(request.environment.as_ref())?;
        request.validate()?;
        let reply = engine
            .get()
            .post_form(
                Operation::RenderTags,
                &env.url_for(GET_RENDER_TAGS_PATH),
                &with_access_key(env, request.fields()),
            )
            .await?;

        let status = reply.response_status();
        let periods = if status.succeeded() {
            reply
                .json::<wire::RenderTags>()
                .map(|e| e.render_tags)
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(RenderTagsResponse { status, periods })
    }

    // --- shared ---------------------------------------------------------

    async fn download<W, F>(
        &self,
        engine: EngineHandle<'_>,
        operation: Operation,
        url: &str,
        fields: Vec<(String, String)>,
        create_writer: F,
    ) -> Result<DownloadResponse>
    where
        W: Write,
        F: Fn() -> std::io::Result<W>,
    {
        let download = engine
            .get()
            .post_form_download(operation, url, &fields, create_writer)
            .await?;
        Ok(download_response(download))
    }
}

fn download_response(download: Download) -> DownloadResponse {
    match download {
        Download::Document {
            status,
            bytes_written,
            ..
        } => DownloadResponse {
            status,
            bytes_written,
        },
        Download::Failed(reply) => DownloadResponse {
            status: reply.response_status(),
            bytes_written: 0,
        },
    }
}

fn access_key(env: &Environment) -> Option<String> {
    env.access_key.clone().filter(|key| !key.is_empty())
}

/// The access key travels as the first form field whenever one is
/// configured; environments without one (Tornado) send no credential.
fn with_access_key(env: &Environment, mut fields: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut all = Vec::with_capacity(fields.len() + 1);
    if let Some(key) = access_key(env) {
        all.push(("accessKey".to_string(), key));
    }
    all.append(&mut fields);
    all
}

fn form_with_access_key(access_key: &Option<String>) -> Form {
    match access_key {
        Some(key) => Form::new().text("accessKey", key.clone()),
        None => Form::new(),
    }
}
