use utoipa::openapi::path::{OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder};
use utoipa::openapi::{
    InfoBuilder, OpenApi, OpenApiBuilder, PathItemType, Paths, PathsBuilder, Required,
    ResponseBuilder, ResponsesBuilder,
};

fn query_param(name: &str, description: &str) -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .build()
}

fn feed_operation(summary: &str, extra: Vec<utoipa::openapi::path::Parameter>) -> PathItemBuilder {
    let mut params = vec![
        query_param("ordering", "engagement or recency"),
        query_param("limit", "Page size, default 20, max 100"),
        query_param("offset", "Posts to skip"),
        query_param("page", "1-based page number, overrides offset"),
        query_param("cursor", "Opaque cursor from a previous response"),
        query_param("include_total", "Return totalCount when true"),
    ];
    params.extend(extra);

    let responses = ResponsesBuilder::new()
        .response("200", ResponseBuilder::new().description("Feed page").build())
        .response("400", ResponseBuilder::new().description("Invalid parameters").build())
        .response("401", ResponseBuilder::new().description("Missing or invalid viewer").build())
        .build();

    PathItemBuilder::new().operation(
        PathItemType::Get,
        OperationBuilder::new()
            .summary(Some(summary))
            .tag("feed")
            .parameters(Some(params))
            .responses(responses)
            .build(),
    )
}

fn paths() -> Paths {
    let pet_id = ParameterBuilder::new()
        .name("pet_id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some("Pet whose posts to list"))
        .build();
    let tag = ParameterBuilder::new()
        .name("tag")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some("Hashtag, with or without the leading #"))
        .build();

    PathsBuilder::new()
        .path(
            "/api/v1/feed/explore",
            feed_operation("Public posts ranked by engagement", Vec::new()).build(),
        )
        .path(
            "/api/v1/feed",
            feed_operation("Posts from the viewer's own and followed pets", Vec::new()).build(),
        )
        .path(
            "/api/v1/feed/pets/{pet_id}",
            feed_operation("Posts of one pet", vec![pet_id]).build(),
        )
        .path(
            "/api/v1/feed/tags/{tag}",
            feed_operation("Public posts mentioning a hashtag", vec![tag]).build(),
        )
        .build()
}

/// OpenAPI document for the feed endpoints.
pub fn doc() -> OpenApi {
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Petgram Feed Service API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(
                    "Explore, home, per-pet and hashtag feeds for the Petgram pet social platform.",
                ))
                .build(),
        )
        .paths(paths())
        .build()
}
